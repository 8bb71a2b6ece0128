mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stagehand_lib::consts::{BUILD_DIR_ENV, WORKSPACE_ENV};
use stagehand_lib::stage::Stage;

use crate::cmd::Workspace;

/// stagehand - provision a headless CI host for an audio synthesis client library
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Pipeline config file (default: stagehand.toml in the workspace)
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Workspace root; the test suite runs here (default: current directory)
  #[arg(long, global = true, env = WORKSPACE_ENV, value_name = "DIR")]
  workspace: Option<PathBuf>,

  /// Directory for the source checkout (default: <workspace>/build)
  #[arg(long, global = true, env = BUILD_DIR_ENV, value_name = "DIR")]
  build_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run provisioning stages (default: all, in pipeline order)
  Run {
    /// Stages to run, in the order given
    #[arg(value_name = "STAGE")]
    stages: Vec<Stage>,

    /// Print commands instead of running them; no files are changed
    #[arg(long)]
    dry_run: bool,

    /// Print the run record as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the commands each stage would run
  Plan {
    #[arg(value_name = "STAGE")]
    stages: Vec<Stage>,
  },

  /// List the pipeline stages
  Stages,

  /// Show the most recent run
  Status {
    /// List every recorded run instead
    #[arg(long)]
    all: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Write a default stagehand.toml
  Init {
    /// Target directory (default: the workspace)
    dir: Option<PathBuf>,

    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match dispatch(cli) {
    Ok(code) => code,
    Err(e) => {
      output::print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
  let workspace = || Workspace::resolve(cli.workspace.clone(), cli.build_dir.clone());

  match cli.command {
    Commands::Run { stages, dry_run, json } => cmd::cmd_run(&workspace()?, cli.config.as_deref(), &stages, dry_run, json),
    Commands::Plan { stages } => {
      cmd::cmd_plan(&workspace()?, cli.config.as_deref(), &stages)?;
      Ok(ExitCode::SUCCESS)
    }
    Commands::Stages => {
      cmd::cmd_stages();
      Ok(ExitCode::SUCCESS)
    }
    Commands::Status { all, json } => {
      cmd::cmd_status(all, json)?;
      Ok(ExitCode::SUCCESS)
    }
    Commands::Init { dir, force } => {
      let dir = match dir {
        Some(dir) => dir,
        None => workspace()?.root,
      };
      cmd::cmd_init(&dir, force)?;
      Ok(ExitCode::SUCCESS)
    }
  }
}
