//! `dockerapp status`.

use anyhow::{Context, Result};
use dockerapp_lib::engine::DockerEngine;
use dockerapp_lib::session::{Session, SessionState};

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

pub fn cmd_status(app: &str, output: OutputFormat) -> Result<()> {
  let session =
    Session::open(app, DockerEngine::from_env()).with_context(|| format!("Cannot open session of {app}"))?;
  let status = session.status().with_context(|| format!("Failed to query session of {app}"))?;

  if output.is_json() {
    return print_json(&status);
  }

  match status.state {
    SessionState::Running { .. } => print_success(&format!("{}: {}", status.app, status.state)),
    _ => print_info(&format!("{}: {}", status.app, status.state)),
  }
  print_stat("Container", &status.container);
  for consumer in &status.attached {
    print_stat("Attached", &format!("pid {} since {}", consumer.pid, consumer.since_unix));
  }

  Ok(())
}
