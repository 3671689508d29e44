//! `dockerapp pack`.

use std::path::Path;

use anyhow::{Context, Result};
use dockerapp_lib::archive::pack;

use crate::output::{OutputFormat, print_json, print_success};

pub fn cmd_pack(source: &Path, dest: Option<&Path>, output: OutputFormat) -> Result<()> {
  let archive = pack(source, dest).with_context(|| format!("Failed to pack {}", source.display()))?;

  if output.is_json() {
    print_json(&serde_json::json!({ "package": archive }))?;
  } else {
    print_success(&format!("Packed {}", archive.display()));
  }

  Ok(())
}
