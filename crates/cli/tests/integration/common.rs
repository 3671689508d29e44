//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Stands in for `docker`: records every call and keeps container state in
/// marker files. `exec` runs the command on the host.
const FAKE_ENGINE: &str = r#"#!/bin/sh
state="$FAKE_ENGINE_STATE"
echo "$*" >> "$state/calls"
case "$1" in
  build)
    [ -f "$state/fail-build" ] && { echo "build failed" >&2; exit 1; }
    exit 0
    ;;
  run)
    touch "$state/running"
    echo 0123456789ab
    ;;
  exec)
    shift
    while [ "${1#--}" != "$1" ]; do shift; done
    shift
    "$@"
    exit $?
    ;;
  container)
    case "$2" in
      inspect)
        if [ -f "$state/running" ]; then echo true
        elif [ -f "$state/stopped" ]; then echo false
        else echo "Error: No such container: $5" >&2; exit 1
        fi
        ;;
      stop) rm -f "$state/running"; touch "$state/stopped" ;;
      rm) rm -f "$state/stopped" ;;
    esac
    ;;
esac
"#;

pub const MANIFEST: &str = r#"{
  "name": "demo",
  "friendlyName": "Demo App",
  "build": { "from": ["alpine"], "run": ["true"] },
  "run": {
    "entryCommand": "echo started",
    "bridge": {
      "in": { "xdg-open": "xdg-open" },
      "out": { "echo": "demo-echo" }
    }
  }
}"#;

/// Isolated test environment.
///
/// Each test gets its own root, home and engine state.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };

    std::fs::create_dir_all(env.state_path()).unwrap();
    std::fs::create_dir_all(env.home_path()).unwrap();
    let engine = env.engine_path();
    std::fs::create_dir_all(engine.parent().unwrap()).unwrap();
    std::fs::write(&engine, FAKE_ENGINE).unwrap();
    std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();

    env
  }

  /// Per-user dockerapp root.
  pub fn root_path(&self) -> PathBuf {
    let p = self.temp.path().join("dockerapp");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn home_path(&self) -> PathBuf {
    self.temp.path().join("home")
  }

  pub fn state_path(&self) -> PathBuf {
    self.temp.path().join("engine-state")
  }

  pub fn engine_path(&self) -> PathBuf {
    self.temp.path().join("bin").join("fake-docker")
  }

  pub fn app_path(&self, name: &str) -> PathBuf {
    self.root_path().join("apps").join(name)
  }

  /// Write an unpacked package and return its directory.
  pub fn write_source(&self, manifest: &str) -> PathBuf {
    let dir = self.temp.path().join("src");
    std::fs::create_dir_all(dir.join("temp")).unwrap();
    std::fs::write(dir.join("manifest.json"), manifest).unwrap();
    std::fs::write(dir.join("temp").join("hello.txt"), "hello\n").unwrap();
    dir
  }

  /// Engine invocations so far, one line per call.
  pub fn engine_calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.state_path().join("calls"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  pub fn calls_starting_with(&self, prefix: &str) -> usize {
    self.engine_calls().iter().filter(|c| c.starts_with(prefix)).count()
  }

  pub fn container_running(&self) -> bool {
    self.state_path().join("running").exists()
  }

  pub fn fail_builds(&self) {
    std::fs::write(self.state_path().join("fail-build"), "").unwrap();
  }

  pub fn envs(&self) -> Vec<(&'static str, PathBuf)> {
    vec![
      ("DOCKERAPP_ROOT", self.root_path()),
      ("DOCKERAPP_ENGINE", self.engine_path()),
      ("FAKE_ENGINE_STATE", self.state_path()),
      ("HOME", self.home_path()),
    ]
  }

  /// Get a pre-configured Command for the dockerapp binary.
  pub fn dockerapp_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("dockerapp");
    cmd.envs(self.envs());
    cmd
  }

  /// A Command running a generated script with the same environment.
  pub fn script_cmd(&self, script: &Path) -> Command {
    let mut cmd = Command::new(script);
    cmd.envs(self.envs());
    cmd
  }

  /// Install the package in `source` and assert success.
  pub fn install(&self, source: &Path) {
    self.dockerapp_cmd().arg("install").arg(source).assert().success();
  }
}
