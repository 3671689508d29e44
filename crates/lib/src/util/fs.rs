//! Filesystem helpers with path-carrying errors.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// A filesystem operation failed.
#[derive(Debug, Error)]
#[error("failed to {op} {}: {source}", path.display())]
pub struct FsError {
  pub op: &'static str,
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

impl FsError {
  pub fn new(op: &'static str, path: &Path, source: io::Error) -> Self {
    Self {
      op,
      path: path.to_path_buf(),
      source,
    }
  }
}

pub fn create_dir_all(path: &Path) -> Result<(), FsError> {
  fs::create_dir_all(path).map_err(|e| FsError::new("create directory", path, e))
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool, FsError> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(FsError::new("remove directory", path, e)),
  }
}

/// Recursively copy `src` into `dst`, creating `dst` if needed.
///
/// File permissions are preserved; symlinks are copied as the files they
/// point to.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), FsError> {
  create_dir_all(dst)?;

  for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(src).to_path_buf();
      FsError::new("read directory", &path, io::Error::other(e))
    })?;

    let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dst.join(relative);

    if entry.file_type().is_dir() {
      create_dir_all(&target)?;
    } else {
      fs::copy(entry.path(), &target).map_err(|e| FsError::new("copy file", entry.path(), e))?;
    }
  }

  Ok(())
}

/// Write `content` to `path` through a temporary sibling file and a rename,
/// so readers see either the old or the new content.
pub fn write_atomic(path: &Path, content: &str, mode: Option<u32>) -> Result<(), FsError> {
  let parent = path.parent().unwrap_or(Path::new("."));
  create_dir_all(parent)?;

  let mut temp =
    tempfile::NamedTempFile::new_in(parent).map_err(|e| FsError::new("create temporary file in", parent, e))?;
  if let Err(e) = temp.write_all(content.as_bytes()) {
    return Err(FsError::new("write", path, e));
  }
  temp.flush().map_err(|e| FsError::new("write", path, e))?;

  if let Some(mode) = mode {
    set_mode(temp.path(), mode)?;
  }

  temp
    .persist(path)
    .map_err(|e| FsError::new("write", path, e.error))?;

  debug!(path = %path.display(), "wrote file");
  Ok(())
}

/// Write an executable (0755) script.
pub fn write_executable(path: &Path, content: &str) -> Result<(), FsError> {
  write_atomic(path, content, Some(0o755))
}

/// Move the fully prepared `staged` directory to `target`, replacing any
/// existing directory there.
///
/// The old tree is renamed aside before the new one moves in, so `target`
/// is only missing for the moment between the two renames.
pub fn replace_dir(staged: &Path, target: &Path) -> Result<(), FsError> {
  let parent = target.parent().unwrap_or(Path::new("."));
  create_dir_all(parent)?;

  let retired = if target.exists() {
    let name = target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let retired = parent.join(format!(".{name}.old-{}", std::process::id()));
    remove_dir_if_exists(&retired)?;
    fs::rename(target, &retired).map_err(|e| FsError::new("move aside", target, e))?;
    Some(retired)
  } else {
    None
  };

  if let Err(e) = fs::rename(staged, target) {
    if let Some(retired) = &retired {
      let _ = fs::rename(retired, target);
    }
    return Err(FsError::new("move into place", target, e));
  }

  if let Some(retired) = retired {
    remove_dir_if_exists(&retired)?;
  }

  Ok(())
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FsError> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| FsError::new("set permissions on", path, e))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<(), FsError> {
  Ok(())
}
