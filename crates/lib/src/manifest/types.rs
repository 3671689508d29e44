//! Manifest types for dockerapp packages.
//!
//! The manifest is the `manifest.json` document at the root of every package.
//! It names the app and describes how its image is built and how its session
//! is run.
//!
//! # Example
//!
//! ```json
//! {
//!   "name": "gimp",
//!   "friendlyName": "GIMP",
//!   "build": {
//!     "from": ["debian:bookworm"],
//!     "run": ["apt-get update", "apt-get install -y gimp"],
//!     "environment": { "LANG": "C.UTF-8" },
//!     "addToPATH": ["/opt/gimp/bin"]
//!   },
//!   "run": {
//!     "entryCommand": "gimp",
//!     "persistentPaths": [],
//!     "bridge": {
//!       "in": { "xdg-open": "xdg-open" },
//!       "out": { "gimp": "gimp" }
//!     }
//!   }
//! }
//! ```
//!
//! # Ordering
//!
//! All maps are [`BTreeMap`]s so that generated artifacts are identical for
//! identical manifests.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::consts::DEFAULT_SHELL;

/// The package descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
  /// Unique app identifier; also the container name and image tag suffix.
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub friendly_name: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub build: BuildSpec,
  #[serde(default, deserialize_with = "null_as_default")]
  pub run: RunSpec,
}

/// How the image is built.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
  /// Base images, in order. Later entries win in multi-stage builds.
  #[serde(default, deserialize_with = "null_as_default")]
  pub from: Vec<String>,
  /// Shell commands run during the image build, in order.
  #[serde(default, deserialize_with = "null_as_default")]
  pub run: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub environment: BTreeMap<String, String>,
  /// Directories prepended to `PATH` inside the image.
  #[serde(rename = "addToPATH", default, deserialize_with = "null_as_default")]
  pub add_to_path: Vec<String>,
}

/// How the session is run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSpec {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entry_command: Option<String>,
  /// Absolute container paths kept across sessions.
  #[serde(default, deserialize_with = "null_as_default")]
  pub persistent_paths: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub bridge: BridgeSpec,
  /// Shell opened when a bridge invocation carries no command.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shell: Option<String>,
}

/// Commands forwarded across the host/container boundary.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSpec {
  /// Host command name -> shim file name placed on the container's `PATH`.
  #[serde(rename = "in", default, deserialize_with = "null_as_default")]
  pub inbound: BTreeMap<String, String>,
  /// Container command -> shim file name placed in the exposed-shim directory.
  #[serde(rename = "out", default, deserialize_with = "null_as_default")]
  pub outbound: BTreeMap<String, String>,
}

impl Manifest {
  /// The app's default command, if the manifest declares one.
  pub fn entry_command(&self) -> Option<&str> {
    self.run.entry_command.as_deref().filter(|c| !c.trim().is_empty())
  }

  /// Session argv that runs the entry command with the caller's arguments
  /// appended. The command is interpreted by the container's `sh`.
  pub fn entry_argv(&self) -> Option<Vec<String>> {
    let entry = self.entry_command()?;
    Some(vec![
      "sh".to_string(),
      "-c".to_string(),
      format!("exec {entry} \"$@\""),
      self.name.clone(),
    ])
  }

  /// Shell used for interactive attaches.
  pub fn shell(&self) -> &str {
    self.run.shell.as_deref().unwrap_or(DEFAULT_SHELL)
  }

  /// Display name, falling back to `name`.
  pub fn display_name(&self) -> &str {
    self.friendly_name.as_deref().unwrap_or(&self.name)
  }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
