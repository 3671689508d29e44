use predicates::prelude::*;

use super::common::{MANIFEST, TestEnv};

#[test]
fn clearcache_removes_tmp_only() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);
  env.dockerapp_cmd().args(["bridge", "demo", "--", "true"]).assert().success();

  let data = env.app_path("demo").join("current");
  assert!(data.join("tmp").is_dir());
  assert!(data.join("home").is_dir());

  env
    .dockerapp_cmd()
    .args(["clearcache", "demo"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Cleared cache of demo"));

  assert!(!data.join("tmp").exists());
  assert!(data.join("home").is_dir());
}

#[test]
fn cleardata_removes_all_data() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);
  env.dockerapp_cmd().args(["bridge", "demo", "--", "true"]).assert().success();

  env.dockerapp_cmd().args(["cleardata", "demo"]).assert().success();

  assert!(!env.app_path("demo").join("current").exists());
  assert!(env.app_path("demo").join("bridge").is_file());

  env
    .dockerapp_cmd()
    .args(["cleardata", "demo"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No data to clear"));
}

#[test]
fn cleardata_refuses_running_session() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);
  std::fs::write(env.state_path().join("running"), "").unwrap();

  env
    .dockerapp_cmd()
    .args(["cleardata", "demo"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("running session"));
}
