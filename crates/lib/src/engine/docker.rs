//! Docker CLI engine.

use std::io::IsTerminal;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info};

use super::{ContainerEngine, ContainerSpec, ContainerState, EngineError};
use crate::consts::{DEFAULT_ENGINE, ENGINE_ENV};

/// Drives a Docker-compatible CLI (`docker`, `podman`, ...).
#[derive(Debug, Clone)]
pub struct DockerEngine {
  program: String,
}

impl Default for DockerEngine {
  fn default() -> Self {
    Self::from_env()
  }
}

impl DockerEngine {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }

  /// Uses `DOCKERAPP_ENGINE` when set, `docker` otherwise.
  pub fn from_env() -> Self {
    match std::env::var(ENGINE_ENV) {
      Ok(program) if !program.is_empty() => Self::new(program),
      _ => Self::new(DEFAULT_ENGINE),
    }
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  /// Run with captured output; a non-zero exit becomes [`EngineError::Failed`].
  fn run_captured(&self, args: &[String]) -> Result<String, EngineError> {
    debug!(program = %self.program, args = ?args, "running engine command");

    let output = Command::new(&self.program)
      .args(args)
      .stdin(Stdio::null())
      .output()
      .map_err(|source| self.spawn_error(source))?;

    if !output.status.success() {
      return Err(self.failed(args, output.status, String::from_utf8_lossy(&output.stderr).into_owned()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run attached to the caller's terminal.
  fn run_inherited(&self, args: &[String]) -> Result<ExitStatus, EngineError> {
    debug!(program = %self.program, args = ?args, "running attached engine command");

    Command::new(&self.program)
      .args(args)
      .status()
      .map_err(|source| self.spawn_error(source))
  }

  fn spawn_error(&self, source: std::io::Error) -> EngineError {
    EngineError::Spawn {
      program: self.program.clone(),
      source,
    }
  }

  fn failed(&self, args: &[String], status: ExitStatus, stderr: String) -> EngineError {
    EngineError::Failed {
      program: self.program.clone(),
      args: args.join(" "),
      code: status.code(),
      stderr,
    }
  }
}

/// Arguments of `docker run` for a detached session container.
pub(crate) fn run_args(spec: &ContainerSpec) -> Vec<String> {
  let mut args: Vec<String> = vec!["run".into(), "--detach".into(), "--interactive".into(), "--tty".into()];

  args.push(format!("--name={}", spec.name));
  if spec.host_network {
    args.push("--net=host".into());
  }
  if spec.privileged {
    args.push("--privileged".into());
  }
  if let Some(user) = spec.user {
    args.push(format!("--user={user}"));
  }
  if let Some(workdir) = &spec.workdir {
    args.push(format!("--workdir={}", workdir.display()));
  }
  for (key, value) in &spec.env {
    args.push(format!("--env={key}={value}"));
  }
  for mount in &spec.mounts {
    args.push(format!("--volume={}", mount.volume_arg()));
  }
  for device in &spec.devices {
    args.push(format!("--device={}", device.display()));
  }

  args.push(spec.image.clone());
  args.extend(spec.command.iter().cloned());
  args
}

/// Arguments of `docker exec` for an attach.
pub(crate) fn exec_args(container: &str, argv: &[String], tty: bool) -> Vec<String> {
  let mut args: Vec<String> = vec!["exec".into(), "--interactive".into()];
  if tty {
    args.push("--tty".into());
  }
  args.push(container.to_string());
  args.extend(argv.iter().cloned());
  args
}

impl ContainerEngine for DockerEngine {
  fn build_image(&self, context: &Path, tag: &str) -> Result<(), EngineError> {
    info!(tag, context = %context.display(), "building image");

    let args = vec![
      "build".to_string(),
      "--tag".to_string(),
      tag.to_string(),
      context.display().to_string(),
    ];
    let status = self.run_inherited(&args)?;
    if !status.success() {
      // Build output already went to the terminal.
      return Err(self.failed(&args, status, String::new()));
    }
    Ok(())
  }

  fn state(&self, container: &str) -> Result<ContainerState, EngineError> {
    let args = vec![
      "container".to_string(),
      "inspect".to_string(),
      "--format".to_string(),
      "{{.State.Running}}".to_string(),
      container.to_string(),
    ];

    match self.run_captured(&args) {
      Ok(output) => match output.as_str() {
        "true" => Ok(ContainerState::Running),
        "false" => Ok(ContainerState::Stopped),
        _ => Err(EngineError::UnexpectedOutput {
          program: self.program.clone(),
          output,
        }),
      },
      Err(EngineError::Failed { stderr, .. }) if stderr.to_ascii_lowercase().contains("no such") => {
        Ok(ContainerState::Missing)
      }
      Err(e) => Err(e),
    }
  }

  fn start(&self, spec: &ContainerSpec) -> Result<(), EngineError> {
    info!(container = %spec.name, image = %spec.image, "starting session container");
    self.run_captured(&run_args(spec)).map(|_| ())
  }

  fn exec(&self, container: &str, argv: &[String]) -> Result<i32, EngineError> {
    let tty = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    let status = self.run_inherited(&exec_args(container, argv, tty))?;
    Ok(exit_code(status))
  }

  fn stop(&self, container: &str) -> Result<(), EngineError> {
    info!(container, "stopping session container");
    self
      .run_captured(&["container".to_string(), "stop".to_string(), container.to_string()])
      .map(|_| ())
  }

  fn remove(&self, container: &str) -> Result<(), EngineError> {
    debug!(container, "removing session container");
    self
      .run_captured(&["container".to_string(), "rm".to_string(), container.to_string()])
      .map(|_| ())
  }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
  use std::os::unix::process::ExitStatusExt;
  status.code().or_else(|| status.signal().map(|s| 128 + s)).unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
  status.code().unwrap_or(1)
}
