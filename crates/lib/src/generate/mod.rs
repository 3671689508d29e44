//! Artifact generation.
//!
//! Turns a [`Manifest`] and an app's [`AppPaths`] into the files an install
//! writes: the Dockerfile, the bridge and entry scripts, and the forwarding
//! shims. Everything is rendered in memory first so that a template failure
//! never leaves a partially written install behind.

mod templates;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::BUILD_CONTEXT_DIR;
use crate::manifest::Manifest;
use crate::store::AppPaths;

pub use templates::{IMAGE_STAGING_DIR, SHEBANG, sh_quote};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
  #[error("manifest field {0} is required to generate artifacts")]
  MissingField(&'static str),

  #[error("path is not valid UTF-8: {}", .0.display())]
  NonUtf8Path(PathBuf),
}

/// A generated forwarding script and the file name it is installed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shim {
  pub file_name: String,
  pub content: String,
}

/// Every generated text artifact of one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
  pub dockerfile: String,
  pub bridge_script: String,
  pub entry_script: String,
  /// One per `bridge.out` entry, for the shared exposed-shim directory.
  pub exposed_shims: Vec<Shim>,
  /// One per `bridge.in` entry, for the app's `bridge-in-bin` directory.
  pub container_shims: Vec<Shim>,
}

impl Artifacts {
  /// Render all artifacts.
  ///
  /// `launcher` is the `dockerapp` executable the bridge script hands off to.
  pub fn generate(manifest: &Manifest, paths: &AppPaths, launcher: &Path) -> Result<Self, TemplateError> {
    let entry_argv = manifest
      .entry_argv()
      .ok_or(TemplateError::MissingField("run.entryCommand"))?;

    let bridge = utf8(&paths.bridge_script)?;
    let bridge_in = utf8(&paths.bridge_in)?;

    let exposed_shims = manifest
      .run
      .bridge
      .outbound
      .iter()
      .map(|(command, file_name)| Shim {
        file_name: file_name.clone(),
        content: templates::exposed_shim(bridge, command),
      })
      .collect();

    let container_shims = manifest
      .run
      .bridge
      .inbound
      .iter()
      .map(|(command, file_name)| Shim {
        file_name: file_name.clone(),
        content: templates::container_shim(bridge_in, command),
      })
      .collect();

    let launcher = utf8(launcher)?;

    Ok(Self {
      dockerfile: dockerfile(manifest, bridge_in)?,
      bridge_script: templates::bridge_script(launcher, manifest.name.as_str()),
      entry_script: templates::entry_script(bridge, &entry_argv),
      exposed_shims,
      container_shims,
    })
  }
}

/// Render the image build file.
///
/// Base images and build commands keep their manifest order; a failing
/// `RUN` fails the whole build.
pub fn dockerfile(manifest: &Manifest, bridge_in: &str) -> Result<String, TemplateError> {
  if manifest.build.from.is_empty() {
    return Err(TemplateError::MissingField("build.from"));
  }

  let mut out = String::new();

  for image in &manifest.build.from {
    let _ = writeln!(out, "FROM {image}");
  }

  let _ = writeln!(out, "COPY ./{BUILD_CONTEXT_DIR} {IMAGE_STAGING_DIR}");

  let mut path_entries = vec![bridge_in];
  path_entries.extend(manifest.build.add_to_path.iter().map(String::as_str));
  let _ = writeln!(out, "{}", templates::dockerfile_path_env(&path_entries));

  for (key, value) in &manifest.build.environment {
    let _ = writeln!(out, "ENV {key}={}", templates::dockerfile_quote(value));
  }

  for command in &manifest.build.run {
    let _ = writeln!(out, "RUN {command}");
  }

  let _ = writeln!(out, "RUN rm -rf {IMAGE_STAGING_DIR}");

  Ok(out)
}

fn utf8(path: &Path) -> Result<&str, TemplateError> {
  path.to_str().ok_or_else(|| TemplateError::NonUtf8Path(path.to_path_buf()))
}
