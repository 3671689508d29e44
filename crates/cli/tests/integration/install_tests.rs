use predicates::prelude::*;

use super::common::{MANIFEST, TestEnv};

#[test]
fn install_directory_generates_app() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);

  env
    .dockerapp_cmd()
    .arg("install")
    .arg(&source)
    .assert()
    .success()
    .stdout(predicate::str::contains("Installed Demo App (demo)"))
    .stdout(predicate::str::contains("demo-echo"));

  let app = env.app_path("demo");
  assert!(app.join("bridge").is_file());
  assert!(app.join("entry").is_file());
  assert!(app.join("builder/Dockerfile").is_file());
  assert!(app.join("builder/temp/hello.txt").is_file());
  assert!(app.join("config/bridge-in-bin/xdg-open").is_file());
  assert!(env.root_path().join("bridge-out-bin/demo-echo").is_file());

  assert_eq!(env.calls_starting_with("build --tag dockerapp-demo"), 1);
}

#[test]
fn install_packed_archive() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);

  env.dockerapp_cmd().arg("pack").arg(&source).assert().success();
  let archive = env.temp.path().join("src.dockerApp");
  assert!(archive.is_file());

  env.dockerapp_cmd().arg("install").arg(&archive).assert().success();

  assert!(env.app_path("demo").join("builder/temp/hello.txt").is_file());
}

#[test]
fn bridge_script_calls_back_into_launcher() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  let bridge = std::fs::read_to_string(env.app_path("demo").join("bridge")).unwrap();
  assert!(bridge.starts_with("#!/bin/sh\n"));
  assert!(bridge.contains(" bridge demo -- \"$@\""));
}

#[test]
fn install_json_output() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);

  let assert = env
    .dockerapp_cmd()
    .args(["install", "-o", "json"])
    .arg(&source)
    .assert()
    .success();

  let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
  let json_start = stdout.find('{').unwrap();
  let value: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
  assert_eq!(value["name"], "demo");
  assert_eq!(value["image"], "dockerapp-demo");
}

#[test]
fn failed_build_keeps_previous_install() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);
  let entry = std::fs::read_to_string(env.app_path("demo").join("entry")).unwrap();

  env.write_source(&MANIFEST.replace("echo started", "echo changed"));
  env.fail_builds();
  env
    .dockerapp_cmd()
    .arg("install")
    .arg(&source)
    .assert()
    .failure()
    .stderr(predicate::str::contains("image build for demo failed"));

  assert_eq!(std::fs::read_to_string(env.app_path("demo").join("entry")).unwrap(), entry);
}

#[test]
fn rebuild_regenerates_identical_artifacts() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);
  let dockerfile = std::fs::read_to_string(env.app_path("demo").join("builder/Dockerfile")).unwrap();

  env
    .dockerapp_cmd()
    .args(["rebuild", "demo"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Rebuilt"));

  assert_eq!(
    std::fs::read_to_string(env.app_path("demo").join("builder/Dockerfile")).unwrap(),
    dockerfile
  );
  assert_eq!(env.calls_starting_with("build "), 2);
}

#[test]
fn list_shows_installed_app() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env
    .dockerapp_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("demo"))
    .stdout(predicate::str::contains("Demo App"));
}
