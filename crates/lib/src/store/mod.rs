//! Installed app layout.
//!
//! Every path an installed app owns is derived from its name alone.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── apps/<name>/
//! │   ├── builder/            # Build context, Dockerfile, manifest.json
//! │   ├── current/            # Persisted data (home/, tmp/, persist/)
//! │   ├── config/
//! │   │   └── bridge-in-bin/  # In-container shims
//! │   ├── bridge              # Generated bridge script
//! │   ├── entry               # Generated entry script
//! │   └── session.json        # Consumer ledger of the running session
//! └── bridge-out-bin/         # Exposed shims of every installed app
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::{BRIDGE_OUT_DIR, BUILD_CONTEXT_DIR, CONTAINER_PREFIX, MANIFEST_FILENAME};
use crate::platform::paths::root_dir;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
  #[error("invalid app name {name:?}: {reason}")]
  InvalidIdentifier { name: String, reason: &'static str },
}

/// Checks that `name` can be used as a directory name, a container name and
/// the last component of an image reference.
///
/// Image references allow lowercase letters and digits, joined by `.`, `_`,
/// `__` or a run of `-`.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
  let invalid = |reason| StoreError::InvalidIdentifier {
    name: name.to_string(),
    reason,
  };

  if name.is_empty() {
    return Err(invalid("name is empty"));
  }
  if name.contains("..") || name.contains('/') || name.contains('\\') {
    return Err(invalid("name must not contain path separators or '..'"));
  }
  if !name
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
  {
    return Err(invalid("name may only contain lowercase letters, digits, '_', '.' and '-'"));
  }

  let alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
  if !name.starts_with(alphanumeric) || !name.ends_with(alphanumeric) {
    return Err(invalid("name must start and end with a lowercase letter or digit"));
  }

  for separator in name.split(alphanumeric).filter(|s| !s.is_empty()) {
    let allowed = matches!(separator, "." | "_" | "__") || separator.chars().all(|c| c == '-');
    if !allowed {
      return Err(invalid("letters and digits must be joined by '.', '_', '__' or dashes"));
    }
  }

  Ok(())
}

/// Filesystem layout of one installed app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
  name: String,
  pub root: PathBuf,
  pub builder: PathBuf,
  pub dockerfile: PathBuf,
  pub manifest: PathBuf,
  pub build_context: PathBuf,
  pub data: PathBuf,
  pub home: PathBuf,
  pub tmp: PathBuf,
  pub persist: PathBuf,
  pub config: PathBuf,
  pub bridge_in: PathBuf,
  pub bridge_script: PathBuf,
  pub entry_script: PathBuf,
  pub session_file: PathBuf,
  pub bridge_out: PathBuf,
}

impl AppPaths {
  /// Layout of `name` under the current per-user root.
  pub fn new(name: &str) -> Result<Self, StoreError> {
    Self::with_root(&root_dir(), name)
  }

  /// Layout of `name` under an explicit root. Performs no I/O.
  pub fn with_root(base: &Path, name: &str) -> Result<Self, StoreError> {
    validate_name(name)?;

    let root = base.join("apps").join(name);
    let builder = root.join("builder");
    let data = root.join("current");
    let config = root.join("config");

    Ok(Self {
      name: name.to_string(),
      dockerfile: builder.join("Dockerfile"),
      manifest: builder.join(MANIFEST_FILENAME),
      build_context: builder.join(BUILD_CONTEXT_DIR),
      home: data.join("home"),
      tmp: data.join("tmp"),
      persist: data.join("persist"),
      bridge_in: config.join("bridge-in-bin"),
      bridge_script: root.join("bridge"),
      entry_script: root.join("entry"),
      session_file: root.join("session.json"),
      bridge_out: base.join(BRIDGE_OUT_DIR),
      builder,
      data,
      config,
      root,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Name of the session container, also used to detect a running session.
  pub fn container_name(&self) -> String {
    format!("{}-{}", CONTAINER_PREFIX, self.name)
  }

  /// Tag of the image built for this app.
  pub fn image_tag(&self) -> String {
    format!("{}-{}", CONTAINER_PREFIX, self.name)
  }

  /// Whether the app has been installed (its generated bridge script exists).
  pub fn is_installed(&self) -> bool {
    self.bridge_script.is_file() && self.manifest.is_file()
  }
}
