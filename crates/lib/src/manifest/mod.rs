//! Package manifest loading and validation.
//!
//! A manifest is only handed out after it passed validation: the name is a
//! safe identifier and every shim file name is unique within its map.

mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::store::{StoreError, validate_name};

pub use types::*;

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("invalid manifest {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("invalid manifest: {0}")]
  InvalidName(#[from] StoreError),

  #[error("invalid manifest: bridge.{map} maps more than one command to shim file {file:?}")]
  DuplicateShim { map: &'static str, file: String },

  #[error("invalid manifest: bridge.{map} entry {key:?} has unusable shim file name {file:?}")]
  InvalidShim {
    map: &'static str,
    key: String,
    file: String,
  },

  #[error("invalid manifest: persistent path {0:?} must be absolute")]
  RelativePersistentPath(String),
}

impl Manifest {
  /// Load and validate the manifest at `path`.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    debug!(path = %path.display(), "loading manifest");

    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    Self::parse(&content).map_err(|e| match e {
      ManifestError::Parse { source, .. } => ManifestError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })
  }

  /// Parse and validate a manifest from JSON text.
  pub fn from_json(content: &str) -> Result<Self, ManifestError> {
    Self::parse(content)
  }

  fn parse(content: &str) -> Result<Self, ManifestError> {
    let manifest: Manifest = serde_json::from_str(content).map_err(|source| ManifestError::Parse {
      path: PathBuf::new(),
      source,
    })?;
    manifest.validate()?;
    Ok(manifest)
  }

  /// Check the invariants that later stages rely on.
  pub fn validate(&self) -> Result<(), ManifestError> {
    validate_name(&self.name)?;
    validate_shims("in", &self.run.bridge.inbound)?;
    validate_shims("out", &self.run.bridge.outbound)?;

    if let Some(path) = self.run.persistent_paths.iter().find(|p| !p.starts_with('/')) {
      return Err(ManifestError::RelativePersistentPath(path.clone()));
    }

    Ok(())
  }
}

fn validate_shims(map: &'static str, shims: &BTreeMap<String, String>) -> Result<(), ManifestError> {
  let mut seen = std::collections::BTreeSet::new();

  for (key, file) in shims {
    let unusable = key.trim().is_empty()
      || file.is_empty()
      || file == "."
      || file == ".."
      || file.contains('/')
      || file.contains('\0');
    if unusable {
      return Err(ManifestError::InvalidShim {
        map,
        key: key.clone(),
        file: file.clone(),
      });
    }
    if !seen.insert(file.as_str()) {
      return Err(ManifestError::DuplicateShim { map, file: file.clone() });
    }
  }

  Ok(())
}
