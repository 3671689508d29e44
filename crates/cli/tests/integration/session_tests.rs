use predicates::prelude::*;

use super::common::{MANIFEST, TestEnv};

#[test]
fn bridge_starts_runs_and_destroys_session() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env
    .dockerapp_cmd()
    .args(["bridge", "demo", "--", "echo", "inside"])
    .assert()
    .success()
    .stdout(predicate::str::contains("inside"));

  assert_eq!(env.calls_starting_with("run "), 1);
  assert_eq!(env.calls_starting_with("container stop dockerapp-demo"), 1);
  assert_eq!(env.calls_starting_with("container rm dockerapp-demo"), 1);
  assert!(!env.container_running());
}

#[test]
fn bridge_forwards_exit_code() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env
    .dockerapp_cmd()
    .args(["bridge", "demo", "--", "sh", "-c", "exit 7"])
    .assert()
    .code(7);

  assert!(!env.container_running());
}

#[test]
fn generated_scripts_reach_the_session() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env
    .script_cmd(&env.app_path("demo").join("bridge"))
    .args(["echo", "via-bridge"])
    .assert()
    .success()
    .stdout(predicate::str::contains("via-bridge"));

  env
    .script_cmd(&env.root_path().join("bridge-out-bin/demo-echo"))
    .arg("via-shim")
    .assert()
    .success()
    .stdout(predicate::str::contains("via-shim"));

  env
    .script_cmd(&env.app_path("demo").join("entry"))
    .arg("now")
    .assert()
    .success()
    .stdout(predicate::str::contains("started now"));
}

#[test]
fn entry_script_and_run_interpret_entry_command_alike() {
  let env = TestEnv::new();
  let manifest = MANIFEST.replace(r#""echo started""#, r#""printf '%s|' \"a b\"""#);
  let source = env.write_source(&manifest);
  env.install(&source);

  env
    .script_cmd(&env.app_path("demo").join("entry"))
    .arg("x")
    .assert()
    .success()
    .stdout("a b|x|");

  env
    .dockerapp_cmd()
    .args(["run", "demo", "--", "x"])
    .assert()
    .success()
    .stdout("a b|x|");
}

#[test]
fn run_uses_entry_command() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env
    .dockerapp_cmd()
    .args(["run", "demo", "--", "twice"])
    .assert()
    .success()
    .stdout(predicate::str::contains("started twice"));
}

#[test]
fn run_start_records_container_options() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env.dockerapp_cmd().args(["bridge", "demo", "--", "true"]).assert().success();

  let run = env
    .engine_calls()
    .into_iter()
    .find(|c| c.starts_with("run "))
    .unwrap();
  assert!(run.contains("--name=dockerapp-demo"));
  assert!(run.contains("--net=host"));
  assert!(run.contains(":/tmp"));
  assert!(run.ends_with("dockerapp-demo bash"));
}

#[test]
fn status_of_idle_app() {
  let env = TestEnv::new();
  let source = env.write_source(MANIFEST);
  env.install(&source);

  env
    .dockerapp_cmd()
    .args(["status", "demo"])
    .assert()
    .success()
    .stdout(predicate::str::contains("not running"));
}
