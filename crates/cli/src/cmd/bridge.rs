//! `dockerapp bridge` and `dockerapp run`.
//!
//! Both attach to the app's shared session. The exit code of the command run
//! inside the session becomes the exit code of this process.

use std::process::ExitCode;

use anyhow::{Context, Result};
use dockerapp_lib::engine::DockerEngine;
use dockerapp_lib::session::Session;
use tracing::debug;

use crate::output::print_warning;

pub fn cmd_bridge(app: &str, args: &[String]) -> Result<ExitCode> {
  let session = open(app)?;
  ignore_interrupts();
  let code = session.attach(args).with_context(|| format!("Bridge to {app} failed"))?;
  Ok(exit_code(code))
}

pub fn cmd_run(app: &str, args: &[String]) -> Result<ExitCode> {
  let session = open(app)?;
  ignore_interrupts();
  let code = session.run_entry(args).with_context(|| format!("Failed to run {app}"))?;
  Ok(exit_code(code))
}

fn open(app: &str) -> Result<Session<DockerEngine>> {
  Session::open(app, DockerEngine::from_env()).with_context(|| format!("Cannot open session of {app}"))
}

/// Interrupts reach the attached command through the terminal; this process
/// has to survive them to check its consumer back in.
fn ignore_interrupts() {
  if let Err(e) = ctrlc::set_handler(|| debug!("interrupt forwarded to session command")) {
    print_warning(&format!("Interrupts will end dockerapp before the session is checked in: {e}"));
  }
}

fn exit_code(code: i32) -> ExitCode {
  ExitCode::from(exit_status(code))
}

/// Exit codes outside 0..=255 are reported as a plain failure.
fn exit_status(code: i32) -> u8 {
  u8::try_from(code).unwrap_or(1)
}
