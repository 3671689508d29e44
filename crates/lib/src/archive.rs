//! Package archives.
//!
//! A package is a zip file with a `.dockerApp` extension holding
//! `manifest.json` at its root and an optional `temp/` build context.
//! Extraction always goes to a fresh scratch directory owned by a
//! [`TempDir`], which deletes it when dropped, on error paths too.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::consts::{MANIFEST_FILENAME, PACKAGE_EXTENSION};
use crate::manifest::{Manifest, ManifestError};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("package not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("invalid package {}: {source}", path.display())]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("invalid package {}: entry {name:?} escapes the package root", path.display())]
  UnsafeEntry { path: PathBuf, name: String },

  #[error("failed to {op} {}: {source}", path.display())]
  Io {
    op: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

impl ArchiveError {
  fn io(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
    let path = path.to_path_buf();
    move |source| ArchiveError::Io { op, path, source }
  }
}

/// Path of the archive `pack` writes for `base` (`<base>.dockerApp`).
pub fn package_path(base: &Path) -> PathBuf {
  let base: PathBuf = base.components().collect();
  let mut name = base.into_os_string();
  name.push(".");
  name.push(PACKAGE_EXTENSION);
  PathBuf::from(name)
}

/// Pack `source` into `<dest>.dockerApp` (`dest` defaults to `source`).
///
/// The source must contain a loadable `manifest.json`. An existing archive at
/// the destination is replaced.
pub fn pack(source: &Path, dest: Option<&Path>) -> Result<PathBuf, ArchiveError> {
  if !source.is_dir() {
    return Err(ArchiveError::NotFound(source.to_path_buf()));
  }
  let manifest = Manifest::load(&source.join(MANIFEST_FILENAME))?;

  let archive_path = package_path(dest.unwrap_or(source));
  info!(app = %manifest.name, archive = %archive_path.display(), "packing");

  if archive_path.exists() {
    fs::remove_file(&archive_path).map_err(ArchiveError::io("remove", &archive_path))?;
  }

  let file = File::create(&archive_path).map_err(ArchiveError::io("create", &archive_path))?;
  let mut writer = ZipWriter::new(BufWriter::new(file));
  let zip_err = |source| ArchiveError::Zip {
    path: archive_path.clone(),
    source,
  };

  let entries = WalkDir::new(source).min_depth(1).sort_by_file_name();
  for entry in entries {
    let entry = entry.map_err(|e| ArchiveError::Io {
      op: "read",
      path: source.to_path_buf(),
      source: io::Error::other(e),
    })?;
    if entry.path() == archive_path {
      continue;
    }

    let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
    let name = relative
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");

    if entry.file_type().is_dir() {
      writer
        .add_directory(format!("{name}/"), SimpleFileOptions::default())
        .map_err(zip_err)?;
      continue;
    }

    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated)
      .unix_permissions(file_mode(entry.path()));
    writer.start_file(name, options).map_err(zip_err)?;

    let mut input = File::open(entry.path()).map_err(ArchiveError::io("read", entry.path()))?;
    io::copy(&mut input, &mut writer).map_err(ArchiveError::io("write", &archive_path))?;
  }

  writer.finish().map_err(zip_err)?;
  Ok(archive_path)
}

/// Extract `archive` into a new scratch directory.
///
/// The directory is deleted when the returned [`TempDir`] is dropped.
pub fn extract(archive: &Path) -> Result<TempDir, ArchiveError> {
  if !archive.is_file() {
    return Err(ArchiveError::NotFound(archive.to_path_buf()));
  }

  let stem = archive
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();
  let scratch = tempfile::Builder::new()
    .prefix(&format!("dockerapp-{stem}-"))
    .tempdir()
    .map_err(ArchiveError::io("create scratch directory for", archive))?;

  debug!(archive = %archive.display(), scratch = %scratch.path().display(), "extracting package");

  let file = File::open(archive).map_err(ArchiveError::io("open", archive))?;
  let mut reader = ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Zip {
    path: archive.to_path_buf(),
    source,
  })?;

  for i in 0..reader.len() {
    let mut entry = reader.by_index(i).map_err(|source| ArchiveError::Zip {
      path: archive.to_path_buf(),
      source,
    })?;

    let Some(relative) = entry.enclosed_name() else {
      return Err(ArchiveError::UnsafeEntry {
        path: archive.to_path_buf(),
        name: entry.name().to_string(),
      });
    };
    let dest = scratch.path().join(relative);

    if entry.is_dir() {
      fs::create_dir_all(&dest).map_err(ArchiveError::io("create", &dest))?;
      continue;
    }

    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).map_err(ArchiveError::io("create", parent))?;
    }
    let mut out = File::create(&dest).map_err(ArchiveError::io("create", &dest))?;
    io::copy(&mut entry, &mut out).map_err(ArchiveError::io("write", &dest))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&dest, fs::Permissions::from_mode(mode & 0o7777))
          .map_err(ArchiveError::io("set permissions on", &dest))?;
      }
    }
  }

  Ok(scratch)
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  fs::metadata(path).map(|m| m.permissions().mode() & 0o7777).unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
  0o644
}
