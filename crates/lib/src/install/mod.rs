//! Installing and rebuilding apps.
//!
//! An install stages a new builder and config next to the installed ones,
//! builds the image from the staged builder, and only then swaps the staged
//! directories into place and rewrites the scripts. A failing build leaves
//! the previous install as it was.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app_lock::{AppLock, AppLockError, LockScope};
use crate::archive::{self, ArchiveError};
use crate::consts::{BUILD_CONTEXT_DIR, EXPOSED_SHIMS_FILE, MANIFEST_FILENAME};
use crate::engine::{ContainerEngine, EngineError};
use crate::generate::{Artifacts, TemplateError, sh_quote};
use crate::manifest::{Manifest, ManifestError};
use crate::platform::paths::root_dir;
use crate::store::{AppPaths, StoreError};
use crate::util::fs::{FsError, copy_dir_all, create_dir_all, replace_dir, write_atomic, write_executable};

#[derive(Debug, Error)]
pub enum InstallError {
  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Lock(#[from] AppLockError),

  #[error("image build for {app} failed: {source}")]
  Engine {
    app: String,
    #[source]
    source: EngineError,
  },

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error("app {0} is not installed")]
  NotInstalled(String),
}

/// Where an install reads the package from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
  /// A packed `.dockerApp` archive.
  Archive(PathBuf),
  /// An unpacked source directory.
  Directory(PathBuf),
}

impl PackageSource {
  /// Directories install as-is, anything else is treated as an archive.
  pub fn detect(path: &Path) -> Self {
    if path.is_dir() {
      PackageSource::Directory(path.to_path_buf())
    } else {
      PackageSource::Archive(path.to_path_buf())
    }
  }
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
  pub source: PackageSource,
  /// The `dockerapp` executable the generated bridge script calls.
  pub launcher: PathBuf,
  /// Per-user root the app is installed under.
  pub root: PathBuf,
}

impl InstallOptions {
  pub fn new(source: PackageSource, launcher: PathBuf) -> Self {
    Self {
      source,
      launcher,
      root: root_dir(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallResult {
  pub name: String,
  pub friendly_name: String,
  pub root: PathBuf,
  pub image: String,
  pub bridge: PathBuf,
  pub exposed_shims: Vec<PathBuf>,
}

/// Install the package described by `options`, replacing any previous
/// install of the same app. Persisted data is kept.
pub fn install<E: ContainerEngine>(options: &InstallOptions, engine: &E) -> Result<InstallResult, InstallError> {
  match &options.source {
    PackageSource::Directory(dir) => {
      if !dir.is_dir() {
        return Err(ArchiveError::NotFound(dir.clone()).into());
      }
      install_from_dir(dir, &options.root, &options.launcher, engine, "install")
    }
    PackageSource::Archive(path) => {
      let scratch = archive::extract(path)?;
      install_from_dir(scratch.path(), &options.root, &options.launcher, engine, "install")
    }
  }
}

/// Regenerate every artifact and rebuild the image of an installed app from
/// its builder directory.
pub fn rebuild<E: ContainerEngine>(
  paths: &AppPaths,
  launcher: &Path,
  engine: &E,
) -> Result<InstallResult, InstallError> {
  if !paths.manifest.is_file() {
    return Err(InstallError::NotInstalled(paths.name().to_string()));
  }

  let base = paths
    .root
    .parent()
    .and_then(Path::parent)
    .map(Path::to_path_buf)
    .unwrap_or_else(root_dir);
  install_from_dir(&paths.builder, &base, launcher, engine, "rebuild")
}

fn install_from_dir<E: ContainerEngine>(
  source: &Path,
  base: &Path,
  launcher: &Path,
  engine: &E,
  command: &str,
) -> Result<InstallResult, InstallError> {
  let manifest = Manifest::load(&source.join(MANIFEST_FILENAME))?;
  let paths = AppPaths::with_root(base, &manifest.name)?;

  let _lock = AppLock::try_acquire(&paths, LockScope::Install, command)?;
  info!(app = %manifest.name, source = %source.display(), "installing");

  let artifacts = Artifacts::generate(&manifest, &paths, launcher)?;

  let builder = stage_builder(source, &paths, &artifacts)?;
  let config = stage_config(&paths, &artifacts)?;

  let image = paths.image_tag();
  engine
    .build_image(builder.path(), &image)
    .map_err(|source| InstallError::Engine {
      app: manifest.name.clone(),
      source,
    })?;

  let previous_shims = owned_shims(&paths.config);
  replace_dir(builder.path(), &paths.builder)?;
  replace_dir(config.path(), &paths.config)?;

  write_executable(&paths.bridge_script, &artifacts.bridge_script)?;
  write_executable(&paths.entry_script, &artifacts.entry_script)?;

  create_dir_all(&paths.bridge_out)?;
  let mut exposed_shims = Vec::with_capacity(artifacts.exposed_shims.len());
  for shim in &artifacts.exposed_shims {
    let path = paths.bridge_out.join(&shim.file_name);
    write_executable(&path, &shim.content)?;
    exposed_shims.push(path);
  }
  prune_exposed_shims(&paths, &previous_shims, &artifacts)?;

  info!(app = %manifest.name, image = %image, "installed");
  Ok(InstallResult {
    name: manifest.name.clone(),
    friendly_name: manifest.display_name().to_string(),
    root: paths.root.clone(),
    image,
    bridge: paths.bridge_script.clone(),
    exposed_shims,
  })
}

/// A fresh hidden directory next to the installed ones, removed on drop
/// unless it was moved into place.
fn staging_dir(paths: &AppPaths, prefix: &str) -> Result<TempDir, FsError> {
  create_dir_all(&paths.root)?;
  tempfile::Builder::new()
    .prefix(prefix)
    .tempdir_in(&paths.root)
    .map_err(|e| FsError::new("create staging directory in", &paths.root, e))
}

fn stage_builder(source: &Path, paths: &AppPaths, artifacts: &Artifacts) -> Result<TempDir, InstallError> {
  let staged = staging_dir(paths, ".builder-")?;
  debug!(path = %staged.path().display(), "staging builder");

  let context = source.join(BUILD_CONTEXT_DIR);
  let staged_context = staged.path().join(BUILD_CONTEXT_DIR);
  if context.is_dir() {
    copy_dir_all(&context, &staged_context)?;
  } else {
    create_dir_all(&staged_context)?;
  }

  let manifest = source.join(MANIFEST_FILENAME);
  let staged_manifest = staged.path().join(MANIFEST_FILENAME);
  fs::copy(&manifest, &staged_manifest).map_err(|e| FsError::new("copy", &manifest, e))?;

  write_atomic(&staged.path().join("Dockerfile"), &artifacts.dockerfile, None)?;
  Ok(staged)
}

fn stage_config(paths: &AppPaths, artifacts: &Artifacts) -> Result<TempDir, InstallError> {
  let staged = staging_dir(paths, ".config-")?;
  let shim_dir = staged.path().join(
    paths
      .bridge_in
      .strip_prefix(&paths.config)
      .unwrap_or(Path::new("bridge-in-bin")),
  );
  create_dir_all(&shim_dir)?;

  for shim in &artifacts.container_shims {
    write_executable(&shim_dir.join(&shim.file_name), &shim.content)?;
  }

  let exposed: Vec<&str> = artifacts.exposed_shims.iter().map(|s| s.file_name.as_str()).collect();
  let record = staged.path().join(EXPOSED_SHIMS_FILE);
  let json = serde_json::to_string_pretty(&exposed).map_err(|e| FsError::new("write", &record, e.into()))?;
  write_atomic(&record, &json, None)?;
  Ok(staged)
}

/// Exposed shim file names recorded by the install in `config`.
fn owned_shims(config: &Path) -> Vec<String> {
  let record = config.join(EXPOSED_SHIMS_FILE);
  let Ok(content) = fs::read_to_string(&record) else {
    return Vec::new();
  };
  serde_json::from_str(&content).unwrap_or_else(|e| {
    warn!(path = %record.display(), error = %e, "ignoring unreadable shim record");
    Vec::new()
  })
}

/// Remove exposed shims a previous install wrote that this one no longer
/// declares. A shim another app has since taken over is left alone.
fn prune_exposed_shims(paths: &AppPaths, previous: &[String], artifacts: &Artifacts) -> Result<(), FsError> {
  let Some(bridge) = paths.bridge_script.to_str() else {
    return Ok(());
  };
  let target = format!("exec {} ", sh_quote(bridge));

  for file_name in previous {
    if artifacts.exposed_shims.iter().any(|s| &s.file_name == file_name) {
      continue;
    }
    let path = paths.bridge_out.join(file_name);
    let owned = fs::read_to_string(&path).is_ok_and(|content| content.contains(&target));
    if owned {
      fs::remove_file(&path).map_err(|e| FsError::new("remove", &path, e))?;
      debug!(path = %path.display(), "removed stale exposed shim");
    }
  }
  Ok(())
}
