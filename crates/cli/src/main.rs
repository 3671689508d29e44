mod cmd;
mod output;
mod registry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use tracing_subscriber::EnvFilter;

/// dockerapp - package, install and run desktop apps in containers
#[derive(Parser)]
#[command(name = "dockerapp")]
#[command(author, version, about, long_about = None, disable_help_subcommand = true)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
  output: OutputFormat,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Install a .dockerApp package (or an unpacked package directory)
  Install {
    /// Path to the package
    package_path: PathBuf,
  },

  /// Pack an app directory into a .dockerApp package
  Pack {
    /// Directory holding manifest.json and temp/
    source_dir: PathBuf,

    /// Package path without extension (default: the source directory)
    dest_path: Option<PathBuf>,
  },

  /// Run a command in the app's shared session (a shell if none is given)
  Bridge {
    /// Installed app name
    app_name: String,

    /// Command and arguments to run in the session
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Run the app's entry command
  Run {
    /// Installed app name
    app_name: String,

    /// Arguments appended to the entry command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Delete all persisted data of an app
  Cleardata {
    /// Installed app name
    app_name: String,
  },

  /// Delete the app's temporary files
  Clearcache {
    /// Installed app name
    app_name: String,
  },

  /// Regenerate scripts and rebuild the image of an installed app
  Rebuild {
    /// Installed app name
    app_name: String,
  },

  /// List every command with its parameters
  Help,

  /// List installed apps
  List,

  /// Show the session state of an app
  Status {
    /// Installed app name
    app_name: String,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(code) => code,
    Err(e) => {
      output::print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
  let format = cli.output;

  let Some(command) = cli.command else {
    cmd::cmd_help(format)?;
    return Ok(ExitCode::SUCCESS);
  };

  match command {
    Commands::Install { package_path } => cmd::cmd_install(&package_path, format)?,
    Commands::Pack { source_dir, dest_path } => cmd::cmd_pack(&source_dir, dest_path.as_deref(), format)?,
    Commands::Bridge { app_name, args } => return cmd::cmd_bridge(&app_name, &args),
    Commands::Run { app_name, args } => return cmd::cmd_run(&app_name, &args),
    Commands::Cleardata { app_name } => cmd::cmd_cleardata(&app_name, format)?,
    Commands::Clearcache { app_name } => cmd::cmd_clearcache(&app_name, format)?,
    Commands::Rebuild { app_name } => cmd::cmd_rebuild(&app_name, format)?,
    Commands::Help => cmd::cmd_help(format)?,
    Commands::List => cmd::cmd_list(cli.verbose, format)?,
    Commands::Status { app_name } => cmd::cmd_status(&app_name, format)?,
  }

  Ok(ExitCode::SUCCESS)
}
