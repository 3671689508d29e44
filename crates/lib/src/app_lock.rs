//! Per-app file locks for mutual exclusion between processes.
//!
//! Every app has two independent locks next to its installed files:
//! - `session`: held around the start and teardown decisions of the shared
//!   session (waits for the holder)
//! - `install`: held for the whole install/rebuild (fails fast on contention)
//!
//! Locks of different apps never interact.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::store::AppPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
  Session,
  Install,
}

impl LockScope {
  fn filename(self) -> &'static str {
    match self {
      LockScope::Session => ".session.lock",
      LockScope::Install => ".install.lock",
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub app: String,
}

#[derive(Debug, Error)]
pub enum AppLockError {
  #[error(
    "App {app} is locked by another process: {command} (PID {pid}, started at Unix timestamp {started_at_unix})\n\
             If you're sure no dockerapp process is running, remove the lock file:\n  {}",
    lock_path.display()
  )]
  Contention {
    app: String,
    command: String,
    pid: u32,
    started_at_unix: u64,
    lock_path: PathBuf,
  },

  #[error(
    "App is locked (could not read lock metadata)\n\
             If you're sure no dockerapp process is running, remove the lock file:\n  {}",
    lock_path.display()
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("Failed to create app directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An exclusive lock on one scope of one app, released on drop.
pub struct AppLock {
  file: File,
  lock_path: PathBuf,
}

impl AppLock {
  /// Wait until the lock is free, then take it.
  pub fn acquire(paths: &AppPaths, scope: LockScope, command: &str) -> Result<Self, AppLockError> {
    let (file, lock_path) = Self::open(paths, scope)?;

    debug!(app = paths.name(), lock = %lock_path.display(), "waiting for app lock");
    lock(&file, true).map_err(AppLockError::LockFailed)?;

    Self::write_metadata(&file, command, paths.name())?;
    Ok(AppLock { file, lock_path })
  }

  /// Take the lock, or fail with the holder's metadata if it is taken.
  pub fn try_acquire(paths: &AppPaths, scope: LockScope, command: &str) -> Result<Self, AppLockError> {
    let (file, lock_path) = Self::open(paths, scope)?;

    if let Err(err) = lock(&file, false) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path));
      }
      return Err(AppLockError::LockFailed(err));
    }

    Self::write_metadata(&file, command, paths.name())?;
    Ok(AppLock { file, lock_path })
  }

  /// Reads the lock metadata from the held file handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn open(paths: &AppPaths, scope: LockScope) -> Result<(File, PathBuf), AppLockError> {
    if !paths.root.exists() {
      std::fs::create_dir_all(&paths.root).map_err(AppLockError::CreateDir)?;
    }

    let lock_path = paths.root.join(scope.filename());
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(AppLockError::OpenFile)?;

    Ok((file, lock_path))
  }

  fn write_metadata(file: &File, command: &str, app: &str) -> Result<(), AppLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      command: command.to_string(),
      app: app.to_string(),
    };

    file.set_len(0).map_err(AppLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    writer.seek(SeekFrom::Start(0)).map_err(AppLockError::WriteMetadata)?;
    serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| AppLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(AppLockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> AppLockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return AppLockError::Contention {
          app: metadata.app,
          command: metadata.command,
          pid: metadata.pid,
          started_at_unix: metadata.started_at_unix,
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    AppLockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }
}

#[cfg(unix)]
fn lock(file: &File, wait: bool) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = if wait {
    FlockOperation::LockExclusive
  } else {
    FlockOperation::NonBlockingLockExclusive
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(not(unix))]
fn lock(file: &File, wait: bool) -> io::Result<()> {
  if wait { file.lock() } else { file.try_lock().map_err(io::Error::from) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::thread;
  use std::time::Duration;
  use tempfile::TempDir;

  fn temp_app(name: &str) -> (TempDir, AppPaths) {
    let temp = TempDir::new().unwrap();
    let paths = AppPaths::with_root(temp.path(), name).unwrap();
    (temp, paths)
  }

  #[test]
  fn acquire_creates_lock_file() {
    let (_temp, paths) = temp_app("app");
    let lock = AppLock::acquire(&paths, LockScope::Session, "test").unwrap();
    assert!(lock.lock_path().exists());
    assert!(lock.lock_path().starts_with(&paths.root));
  }

  #[test]
  fn lock_metadata_written() {
    let (_temp, paths) = temp_app("app");
    let lock = AppLock::try_acquire(&paths, LockScope::Install, "my-command").unwrap();

    let metadata = lock.read_metadata().unwrap();

    assert_eq!(metadata.version, 1);
    assert_eq!(metadata.command, "my-command");
    assert_eq!(metadata.app, "app");
    assert_eq!(metadata.pid, std::process::id());
  }

  #[test]
  #[cfg(unix)]
  fn try_acquire_reports_holder() {
    let (_temp, paths) = temp_app("app");
    let _held = AppLock::try_acquire(&paths, LockScope::Install, "install").unwrap();

    let err = AppLock::try_acquire(&paths, LockScope::Install, "rebuild").err().unwrap();

    match err {
      AppLockError::Contention { command, pid, .. } => {
        assert_eq!(command, "install");
        assert_eq!(pid, std::process::id());
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn scopes_are_independent() {
    let (_temp, paths) = temp_app("app");
    let _install = AppLock::try_acquire(&paths, LockScope::Install, "install").unwrap();
    let session = AppLock::try_acquire(&paths, LockScope::Session, "bridge");
    assert!(session.is_ok());
  }

  #[test]
  fn apps_are_independent() {
    let temp = TempDir::new().unwrap();
    let a = AppPaths::with_root(temp.path(), "a").unwrap();
    let b = AppPaths::with_root(temp.path(), "b").unwrap();

    let _a = AppLock::try_acquire(&a, LockScope::Session, "bridge").unwrap();
    assert!(AppLock::try_acquire(&b, LockScope::Session, "bridge").is_ok());
  }

  #[test]
  fn lock_released_on_drop() {
    let (_temp, paths) = temp_app("app");
    {
      let _lock = AppLock::try_acquire(&paths, LockScope::Install, "first").unwrap();
    }
    assert!(AppLock::try_acquire(&paths, LockScope::Install, "second").is_ok());
  }

  #[test]
  #[cfg(unix)]
  fn acquire_waits_for_holder() {
    let (_temp, paths) = temp_app("app");
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
      .map(|_| {
        let paths = paths.clone();
        let inside = Arc::clone(&inside);
        let max_inside = Arc::clone(&max_inside);
        thread::spawn(move || {
          let _lock = AppLock::acquire(&paths, LockScope::Session, "bridge").unwrap();
          let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
          max_inside.fetch_max(now, Ordering::SeqCst);
          thread::sleep(Duration::from_millis(20));
          inside.fetch_sub(1, Ordering::SeqCst);
        })
      })
      .collect();

    for handle in handles {
      handle.join().unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
  }
}
