//! `dockerapp list`.

use anyhow::Result;
use dockerapp_lib::app::list_installed;
use dockerapp_lib::platform::paths::root_dir;
use owo_colors::{OwoColorize, Stream};

use crate::output::{OutputFormat, print_info, print_json};

pub fn cmd_list(verbose: bool, output: OutputFormat) -> Result<()> {
  let apps = list_installed(&root_dir())?;

  if output.is_json() {
    return print_json(&apps);
  }

  if apps.is_empty() {
    print_info("No apps installed");
    return Ok(());
  }

  for app in &apps {
    let entry = match (&app.entry_command, verbose) {
      (Some(entry), true) => format!(" [{entry}]"),
      _ => String::new(),
    };
    println!(
      "{} {}{}",
      app.name,
      format!("({})", app.friendly_name).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      entry
    );
  }

  print_info(&format!("{} app(s) installed", apps.len()));
  Ok(())
}
