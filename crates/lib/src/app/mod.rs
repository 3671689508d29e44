//! Maintenance of installed apps.

use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::app_lock::{AppLock, AppLockError, LockScope};
use crate::engine::{ContainerEngine, ContainerState, EngineError};
use crate::manifest::Manifest;
use crate::store::{AppPaths, StoreError};
use crate::util::fs::{FsError, remove_dir_if_exists};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("app {0} is not installed")]
  NotInstalled(String),

  #[error("app {0} has a running session; close it first")]
  SessionActive(String),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Lock(#[from] AppLockError),

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error(transparent)]
  Fs(#[from] FsError),
}

/// One entry of `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledApp {
  pub name: String,
  pub friendly_name: String,
  pub entry_command: Option<String>,
}

/// Delete all persisted data of `paths` (`current/`). Returns whether
/// anything was removed.
pub fn clear_data<E: ContainerEngine>(paths: &AppPaths, engine: &E) -> Result<bool, AppError> {
  clear(paths, engine, &paths.data, "cleardata")
}

/// Delete the session's `/tmp` backing directory. Returns whether anything
/// was removed.
pub fn clear_cache<E: ContainerEngine>(paths: &AppPaths, engine: &E) -> Result<bool, AppError> {
  clear(paths, engine, &paths.tmp, "clearcache")
}

fn clear<E: ContainerEngine>(paths: &AppPaths, engine: &E, target: &Path, command: &str) -> Result<bool, AppError> {
  if !paths.is_installed() {
    return Err(AppError::NotInstalled(paths.name().to_string()));
  }

  // Holding the session lock keeps a session from starting mid-removal.
  let _lock = AppLock::acquire(paths, LockScope::Session, command)?;
  if engine.state(&paths.container_name())? == ContainerState::Running {
    return Err(AppError::SessionActive(paths.name().to_string()));
  }

  let removed = remove_dir_if_exists(target)?;
  info!(app = paths.name(), path = %target.display(), removed, "cleared");
  Ok(removed)
}

/// Every installed app under `root`, sorted by name.
pub fn list_installed(root: &Path) -> Result<Vec<InstalledApp>, AppError> {
  let apps_dir = root.join("apps");
  let entries = match fs::read_dir(&apps_dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(FsError::new("read directory", &apps_dir, e).into()),
  };

  let mut apps = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|e| FsError::new("read directory", &apps_dir, e))?;
    let name = entry.file_name().to_string_lossy().into_owned();
    let Ok(paths) = AppPaths::with_root(root, &name) else {
      continue;
    };
    if !paths.is_installed() {
      continue;
    }

    match Manifest::load(&paths.manifest) {
      Ok(manifest) => apps.push(InstalledApp {
        name: manifest.name.clone(),
        friendly_name: manifest.display_name().to_string(),
        entry_command: manifest.entry_command().map(str::to_string),
      }),
      Err(e) => warn!(app = %name, error = %e, "skipping app with unreadable manifest"),
    }
  }

  apps.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(apps)
}
