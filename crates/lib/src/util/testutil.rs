//! Test utilities for dockerapp-lib.
//!
//! [`FakeEngine`] records every engine call in memory so installer and
//! session tests run without a container engine.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use crate::engine::{ContainerEngine, ContainerSpec, ContainerState, EngineError};

pub const SOURCE_MANIFEST: &str = r#"{
  "name": "NAME",
  "friendlyName": "Test App",
  "build": {
    "from": ["debian:bookworm"],
    "run": ["sh /app/temp/setup.sh"],
    "environment": { "LANG": "C.UTF-8" },
    "addToPATH": ["/opt/app/bin"]
  },
  "run": {
    "entryCommand": "app --start",
    "persistentPaths": ["/var/lib/app"],
    "bridge": {
      "in": { "xdg-open": "xdg-open" },
      "out": { "screenshot": "app-screenshot" }
    }
  }
}"#;

/// Create `<base>/<name>/` holding a valid manifest and an executable
/// `temp/setup.sh`.
pub fn write_source_dir(base: &Path, name: &str) -> PathBuf {
  let dir = base.join(name);
  fs::create_dir_all(dir.join("temp")).unwrap();
  fs::write(dir.join("manifest.json"), SOURCE_MANIFEST.replace("NAME", name)).unwrap();

  let script = dir.join("temp/setup.sh");
  fs::write(&script, "#!/bin/sh\necho setup\n").unwrap();
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
  }

  dir
}

#[derive(Debug, Default)]
pub struct FakeState {
  /// Image tags built, with the Dockerfile each build saw.
  pub builds: Vec<(String, String)>,
  pub starts: Vec<ContainerSpec>,
  pub execs: Vec<(String, Vec<String>)>,
  pub stops: usize,
  pub removes: usize,
  pub running: BTreeSet<String>,
  pub stopped: BTreeSet<String>,
  pub fail_build: bool,
  pub exec_code: i32,
}

/// In-memory [`ContainerEngine`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
  state: Arc<Mutex<FakeState>>,
  exec_barrier: Option<Arc<Barrier>>,
}

impl FakeEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every `exec` waits until `parties` execs are in flight together.
  pub fn with_exec_barrier(parties: usize) -> Self {
    Self {
      exec_barrier: Some(Arc::new(Barrier::new(parties))),
      ..Self::default()
    }
  }

  pub fn failing_build() -> Self {
    let engine = Self::default();
    engine.calls().fail_build = true;
    engine
  }

  pub fn calls(&self) -> MutexGuard<'_, FakeState> {
    self.state.lock().unwrap()
  }

  pub fn start_count(&self) -> usize {
    self.calls().starts.len()
  }

  pub fn is_running(&self, container: &str) -> bool {
    self.calls().running.contains(container)
  }

  pub fn set_stopped(&self, container: &str) {
    let mut state = self.calls();
    state.running.remove(container);
    state.stopped.insert(container.to_string());
  }

  fn failed(args: &str, stderr: &str) -> EngineError {
    EngineError::Failed {
      program: "fake".into(),
      args: args.into(),
      code: Some(1),
      stderr: stderr.into(),
    }
  }
}

impl ContainerEngine for FakeEngine {
  fn build_image(&self, context: &Path, tag: &str) -> Result<(), EngineError> {
    let dockerfile = fs::read_to_string(context.join("Dockerfile")).unwrap_or_default();
    let mut state = self.calls();
    if state.fail_build {
      return Err(Self::failed(&format!("build --tag {tag}"), "RUN step failed"));
    }
    state.builds.push((tag.to_string(), dockerfile));
    Ok(())
  }

  fn state(&self, container: &str) -> Result<ContainerState, EngineError> {
    let state = self.calls();
    Ok(if state.running.contains(container) {
      ContainerState::Running
    } else if state.stopped.contains(container) {
      ContainerState::Stopped
    } else {
      ContainerState::Missing
    })
  }

  fn start(&self, spec: &ContainerSpec) -> Result<(), EngineError> {
    let mut state = self.calls();
    if state.running.contains(&spec.name) || state.stopped.contains(&spec.name) {
      return Err(Self::failed("run", "container name already in use"));
    }
    state.running.insert(spec.name.clone());
    state.starts.push(spec.clone());
    Ok(())
  }

  fn exec(&self, container: &str, argv: &[String]) -> Result<i32, EngineError> {
    let code = {
      let mut state = self.calls();
      if !state.running.contains(container) {
        return Err(Self::failed("exec", "container is not running"));
      }
      state.execs.push((container.to_string(), argv.to_vec()));
      state.exec_code
    };
    if let Some(barrier) = &self.exec_barrier {
      barrier.wait();
    }
    Ok(code)
  }

  fn stop(&self, container: &str) -> Result<(), EngineError> {
    let mut state = self.calls();
    if !state.running.remove(container) {
      return Err(Self::failed("container stop", "No such container"));
    }
    state.stopped.insert(container.to_string());
    state.stops += 1;
    Ok(())
  }

  fn remove(&self, container: &str) -> Result<(), EngineError> {
    let mut state = self.calls();
    if !state.stopped.remove(container) {
      return Err(Self::failed("container rm", "No such container"));
    }
    state.removes += 1;
    Ok(())
  }
}
