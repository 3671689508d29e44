use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use crate::output::{OutputFormat, print_json};
use crate::registry::COMMANDS;

pub fn cmd_help(output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(&COMMANDS);
  }

  for command in COMMANDS {
    println!(
      "{:<56} {}",
      command.signature(),
      command.summary.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  Ok(())
}
