//! `dockerapp install` and `dockerapp rebuild`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use dockerapp_lib::engine::DockerEngine;
use dockerapp_lib::install::{InstallOptions, InstallResult, PackageSource, install, rebuild};
use dockerapp_lib::platform::paths::{bridge_out_dir, launcher_path};
use dockerapp_lib::store::AppPaths;

use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success};

pub fn cmd_install(package: &Path, output: OutputFormat) -> Result<()> {
  let launcher = launcher()?;
  let options = InstallOptions::new(PackageSource::detect(package), launcher);
  let engine = DockerEngine::from_env();

  let start = Instant::now();
  let result =
    install(&options, &engine).with_context(|| format!("Failed to install {}", package.display()))?;

  report("Installed", &result, start.elapsed(), output)
}

pub fn cmd_rebuild(app: &str, output: OutputFormat) -> Result<()> {
  let paths = AppPaths::new(app)?;
  let launcher = launcher()?;
  let engine = DockerEngine::from_env();

  let start = Instant::now();
  let result = rebuild(&paths, &launcher, &engine).with_context(|| format!("Failed to rebuild {app}"))?;

  report("Rebuilt", &result, start.elapsed(), output)
}

fn launcher() -> Result<PathBuf> {
  launcher_path().context("Failed to locate the dockerapp executable")
}

fn report(verb: &str, result: &InstallResult, elapsed: Duration, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(result);
  }

  print_success(&format!(
    "{verb} {} ({}) in {}",
    result.friendly_name,
    result.name,
    format_duration(elapsed)
  ));
  print_stat("Location", &result.root.display().to_string());
  print_stat("Image", &result.image);
  print_stat("Bridge", &result.bridge.display().to_string());

  if !result.exposed_shims.is_empty() {
    let names: Vec<String> = result
      .exposed_shims
      .iter()
      .filter_map(|p| p.file_name())
      .map(|n| n.to_string_lossy().into_owned())
      .collect();
    print_stat("Commands", &names.join(", "));
    println!();
    print_info(&format!(
      "Add {} to your PATH to call them from the host",
      bridge_out_dir().display()
    ));
  }

  Ok(())
}
