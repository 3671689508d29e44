//! `dockerapp cleardata` and `dockerapp clearcache`.

use anyhow::{Context, Result};
use dockerapp_lib::app::{clear_cache, clear_data};
use dockerapp_lib::engine::DockerEngine;
use dockerapp_lib::store::AppPaths;

use crate::output::{OutputFormat, print_info, print_json, print_success};

pub fn cmd_cleardata(app: &str, output: OutputFormat) -> Result<()> {
  let paths = AppPaths::new(app)?;
  let removed =
    clear_data(&paths, &DockerEngine::from_env()).with_context(|| format!("Failed to clear data of {app}"))?;
  report(app, "data", removed, output)
}

pub fn cmd_clearcache(app: &str, output: OutputFormat) -> Result<()> {
  let paths = AppPaths::new(app)?;
  let removed =
    clear_cache(&paths, &DockerEngine::from_env()).with_context(|| format!("Failed to clear cache of {app}"))?;
  report(app, "cache", removed, output)
}

fn report(app: &str, what: &str, removed: bool, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(&serde_json::json!({ "app": app, "cleared": what, "removed": removed }));
  }

  if removed {
    print_success(&format!("Cleared {what} of {app}"));
  } else {
    print_info(&format!("No {what} to clear for {app}"));
  }
  Ok(())
}
