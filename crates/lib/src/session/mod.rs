//! Shared container sessions.
//!
//! Every invocation of an app's bridge goes through one [`Session`]:
//!
//! ```text
//! NotRunning ──check-out──▶ Starting ──▶ Running{n}
//!                                          │  ▲
//!                              check-out/in│  │ consumers remain
//!                                          ▼  │
//!                         last check-in ─▶ Draining ──▶ Destroyed
//! ```
//!
//! Check-out and check-in run under the app's session lock, so deciding to
//! start and starting (or deciding to tear down and tearing down) is never
//! interleaved with another invocation. The attach itself runs unlocked.

mod ledger;
mod mounts;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app_lock::{AppLock, AppLockError, LockScope};
use crate::engine::{ContainerEngine, ContainerState, EngineError};
use crate::manifest::{Manifest, ManifestError};
use crate::platform::is_process_alive;
use crate::store::{AppPaths, StoreError};
use crate::util::fs::{FsError, create_dir_all};

pub use ledger::{Consumer, LEDGER_VERSION, Ledger, LedgerError};
pub use mounts::{HostEnv, app_mounts, container_spec, persist_dir};

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("app {0} is not installed")]
  NotInstalled(String),

  #[error("app {0} has no entryCommand")]
  NoEntryCommand(String),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Lock(#[from] AppLockError),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error(transparent)]
  Fs(#[from] FsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
  NotRunning,
  Starting,
  Running { consumers: usize },
  Draining,
  Destroyed,
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SessionState::NotRunning => write!(f, "not running"),
      SessionState::Starting => write!(f, "starting"),
      SessionState::Running { consumers } => write!(f, "running ({consumers} attached)"),
      SessionState::Draining => write!(f, "draining"),
      SessionState::Destroyed => write!(f, "destroyed"),
    }
  }
}

/// Snapshot reported by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
  pub app: String,
  pub container: String,
  #[serde(flatten)]
  pub state: SessionState,
  pub attached: Vec<Consumer>,
}

/// The shared session of one installed app.
pub struct Session<E: ContainerEngine> {
  paths: AppPaths,
  manifest: Manifest,
  engine: E,
  host: HostEnv,
}

impl<E: ContainerEngine> Session<E> {
  /// Open the session of the installed app `name`.
  pub fn open(name: &str, engine: E) -> Result<Self, SessionError> {
    let paths = AppPaths::new(name)?;
    Self::with_paths(paths, engine, HostEnv::current())
  }

  pub fn with_paths(paths: AppPaths, engine: E, host: HostEnv) -> Result<Self, SessionError> {
    if !paths.is_installed() {
      return Err(SessionError::NotInstalled(paths.name().to_string()));
    }
    let manifest = Manifest::load(&paths.manifest)?;

    Ok(Self {
      paths,
      manifest,
      engine,
      host,
    })
  }

  pub fn paths(&self) -> &AppPaths {
    &self.paths
  }

  pub fn manifest(&self) -> &Manifest {
    &self.manifest
  }

  /// Run `argv` in the session, or the interactive shell when `argv` is
  /// empty. Returns the command's exit code.
  pub fn attach(&self, argv: &[String]) -> Result<i32, SessionError> {
    let argv = if argv.is_empty() {
      vec![self.manifest.shell().to_string()]
    } else {
      argv.to_vec()
    };

    let guard = self.check_out()?;
    let result = self.engine.exec(&self.paths.container_name(), &argv);
    guard.check_in()?;

    Ok(result?)
  }

  /// Run the app's entry command followed by `args`.
  pub fn run_entry(&self, args: &[String]) -> Result<i32, SessionError> {
    let mut argv = self
      .manifest
      .entry_argv()
      .ok_or_else(|| SessionError::NoEntryCommand(self.paths.name().to_string()))?;
    argv.extend(args.iter().cloned());
    self.attach(&argv)
  }

  /// Current state and attached consumers, without modifying anything.
  pub fn status(&self) -> Result<SessionStatus, SessionError> {
    let container = self.paths.container_name();
    let _lock = AppLock::acquire(&self.paths, LockScope::Session, "status")?;

    let mut ledger = Ledger::load(&self.paths.session_file, &container)?;
    ledger.prune(is_process_alive);

    let state = match self.engine.state(&container)? {
      ContainerState::Running => SessionState::Running {
        consumers: ledger.len(),
      },
      ContainerState::Stopped | ContainerState::Missing => SessionState::NotRunning,
    };

    Ok(SessionStatus {
      app: self.paths.name().to_string(),
      container,
      state,
      attached: if matches!(state, SessionState::Running { .. }) {
        ledger.consumers
      } else {
        Vec::new()
      },
    })
  }

  /// Register this invocation as a consumer, starting the container if
  /// nobody else is using it.
  pub fn check_out(&self) -> Result<CheckoutGuard<'_, E>, SessionError> {
    let container = self.paths.container_name();
    let _lock = AppLock::acquire(&self.paths, LockScope::Session, "bridge")?;

    let mut ledger = Ledger::load(&self.paths.session_file, &container)?;
    let pruned = ledger.prune(is_process_alive);
    if pruned > 0 {
      debug!(app = self.paths.name(), pruned, "dropped stale session consumers");
    }

    let engine_state = self.engine.state(&container)?;
    if engine_state != ContainerState::Running {
      transition(self.paths.name(), SessionState::NotRunning, SessionState::Starting);
      ledger = Ledger::new(&container);
      self.start(engine_state)?;
    }

    let consumer = Consumer::current();
    let id = consumer.id.clone();
    ledger.check_out(consumer);
    ledger.save(&self.paths.session_file)?;

    debug!(app = self.paths.name(), consumer = %id, consumers = ledger.len(), "checked out session");
    Ok(CheckoutGuard {
      session: self,
      id: Some(id),
    })
  }

  fn start(&self, engine_state: ContainerState) -> Result<(), SessionError> {
    create_dir_all(&self.paths.home)?;
    create_dir_all(&self.paths.tmp)?;
    for path in &self.manifest.run.persistent_paths {
      create_dir_all(&persist_dir(&self.paths, path))?;
    }

    let container = self.paths.container_name();
    if engine_state == ContainerState::Stopped {
      debug!(container = %container, "removing leftover stopped container");
      self.engine.remove(&container)?;
    }

    info!(app = self.paths.name(), container = %container, "starting session");
    self
      .engine
      .start(&container_spec(&self.paths, &self.manifest, &self.host))?;
    transition(self.paths.name(), SessionState::Starting, SessionState::Running { consumers: 1 });
    Ok(())
  }

  /// Remove consumer `id`; tear the container down if it was the last one.
  fn check_in(&self, id: &str) -> Result<SessionState, SessionError> {
    let container = self.paths.container_name();
    let _lock = AppLock::acquire(&self.paths, LockScope::Session, "bridge")?;

    let mut ledger = Ledger::load(&self.paths.session_file, &container)?;
    if !ledger.check_in(id) {
      warn!(app = self.paths.name(), consumer = id, "consumer missing from session ledger");
    }
    ledger.prune(is_process_alive);

    if !ledger.is_empty() {
      ledger.save(&self.paths.session_file)?;
      let state = SessionState::Running {
        consumers: ledger.len(),
      };
      info!(app = self.paths.name(), consumers = ledger.len(), "session still in use");
      return Ok(state);
    }

    transition(
      self.paths.name(),
      SessionState::Running { consumers: 0 },
      SessionState::Draining,
    );
    match self.engine.state(&container)? {
      ContainerState::Running => {
        self.engine.stop(&container)?;
        self.engine.remove(&container)?;
      }
      ContainerState::Stopped => self.engine.remove(&container)?,
      ContainerState::Missing => {}
    }
    ledger.save(&self.paths.session_file)?;

    info!(app = self.paths.name(), container = %container, "session destroyed");
    transition(self.paths.name(), SessionState::Draining, SessionState::Destroyed);
    Ok(SessionState::Destroyed)
  }
}

fn transition(app: &str, from: SessionState, to: SessionState) {
  debug!(app, %from, %to, "session transition");
}

/// A checked-out consumer. Checks in when dropped.
pub struct CheckoutGuard<'a, E: ContainerEngine> {
  session: &'a Session<E>,
  id: Option<String>,
}

impl<E: ContainerEngine> CheckoutGuard<'_, E> {
  pub fn id(&self) -> &str {
    self.id.as_deref().unwrap_or_default()
  }

  /// Check in now and report the resulting session state.
  pub fn check_in(mut self) -> Result<SessionState, SessionError> {
    match self.id.take() {
      Some(id) => self.session.check_in(&id),
      None => Ok(SessionState::NotRunning),
    }
  }
}

impl<E: ContainerEngine> Drop for CheckoutGuard<'_, E> {
  fn drop(&mut self) {
    if let Some(id) = self.id.take()
      && let Err(e) = self.session.check_in(&id)
    {
      warn!(consumer = %id, error = %e, "failed to check in session consumer");
    }
  }
}
