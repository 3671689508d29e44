//! Container engine interface.
//!
//! The installer and the session protocol talk to the engine only through
//! [`ContainerEngine`]. [`DockerEngine`] shells out to a Docker-compatible
//! CLI; tests substitute an in-memory engine.

mod docker;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::platform::HostUser;

pub use docker::DockerEngine;

/// An engine invocation failed. The engine's own diagnostics are kept
/// verbatim.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{program} {args} failed with exit code {}{}", format_code(*code), format_stderr(stderr))]
  Failed {
    program: String,
    args: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("unexpected output from {program}: {output:?}")]
  UnexpectedOutput { program: String, output: String },
}

fn format_code(code: Option<i32>) -> String {
  code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn format_stderr(stderr: &str) -> String {
  let trimmed = stderr.trim_end();
  if trimmed.is_empty() {
    String::new()
  } else {
    format!(":\n{trimmed}")
  }
}

/// What the engine knows about a named container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
  Missing,
  Stopped,
  Running,
}

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
  pub source: PathBuf,
  pub target: String,
  pub read_only: bool,
}

impl Mount {
  pub fn rw(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
      read_only: false,
    }
  }

  pub fn ro(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
      read_only: true,
    }
  }

  /// The `--volume` value for this mount.
  pub fn volume_arg(&self) -> String {
    let suffix = if self.read_only { ":ro" } else { "" };
    format!("{}:{}{}", self.source.display(), self.target, suffix)
  }
}

/// Everything needed to start a detached session container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
  pub name: String,
  pub image: String,
  pub mounts: Vec<Mount>,
  pub devices: Vec<PathBuf>,
  pub env: Vec<(String, String)>,
  pub user: Option<HostUser>,
  pub workdir: Option<PathBuf>,
  pub host_network: bool,
  pub privileged: bool,
  /// Long-running placeholder process keeping the container alive.
  pub command: Vec<String>,
}

pub trait ContainerEngine {
  /// Build `context` into an image tagged `tag`.
  fn build_image(&self, context: &Path, tag: &str) -> Result<(), EngineError>;

  fn state(&self, container: &str) -> Result<ContainerState, EngineError>;

  /// Start a detached container. Returns once it is running.
  fn start(&self, spec: &ContainerSpec) -> Result<(), EngineError>;

  /// Run `argv` inside `container` attached to the caller's terminal and
  /// return its exit code.
  fn exec(&self, container: &str, argv: &[String]) -> Result<i32, EngineError>;

  fn stop(&self, container: &str) -> Result<(), EngineError>;

  fn remove(&self, container: &str) -> Result<(), EngineError>;
}

impl<E: ContainerEngine + ?Sized> ContainerEngine for &E {
  fn build_image(&self, context: &Path, tag: &str) -> Result<(), EngineError> {
    (**self).build_image(context, tag)
  }

  fn state(&self, container: &str) -> Result<ContainerState, EngineError> {
    (**self).state(container)
  }

  fn start(&self, spec: &ContainerSpec) -> Result<(), EngineError> {
    (**self).start(spec)
  }

  fn exec(&self, container: &str, argv: &[String]) -> Result<i32, EngineError> {
    (**self).exec(container, argv)
  }

  fn stop(&self, container: &str) -> Result<(), EngineError> {
    (**self).stop(container)
  }

  fn remove(&self, container: &str) -> Result<(), EngineError> {
    (**self).remove(container)
  }
}
