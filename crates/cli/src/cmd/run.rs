//! Implementation of the `stagehand run` command.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use stagehand_lib::exec::{ProcessRunner, RecordingRunner};
use stagehand_lib::pipeline::{RunRecord, resolve_stages, run_pipeline};
use stagehand_lib::platform;
use stagehand_lib::stage::Stage;
use stagehand_lib::state::RunStore;

use super::{Workspace, load_config};
use crate::output::{print_info, print_json, print_record, print_warning};

/// Execute the run command.
///
/// Runs the requested stages (all of them by default), saves the run record,
/// and exits non-zero if any stage failed.
pub fn cmd_run(
  workspace: &Workspace,
  config_path: Option<&Path>,
  stages: &[Stage],
  dry_run: bool,
  json: bool,
) -> Result<ExitCode> {
  let config = load_config(config_path, workspace)?;
  let stages = resolve_stages(stages);
  let elevated = platform::is_elevated();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  let (record, planned) = if dry_run {
    let runner = RecordingRunner::new(elevated);
    let record = rt.block_on(run_pipeline(&stages, &workspace.context(&config, &runner, true)));
    (record, runner.command_lines())
  } else {
    let timeout = config.stage_timeout_secs.map(Duration::from_secs);
    let runner = ProcessRunner::new(elevated).with_timeout(timeout);
    let record = rt.block_on(run_pipeline(&stages, &workspace.context(&config, &runner, false)));
    (record, Vec::new())
  };

  save_record(&record);

  if json {
    print_json(&record)?;
  } else {
    if dry_run {
      print_info("Dry run, nothing was executed. Commands:");
      for line in &planned {
        println!("    {}", line);
      }
      println!();
    }
    print_record(&record);
  }

  Ok(if record.is_success() {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}

/// A run that cannot be recorded has still happened; warn and carry on.
fn save_record(record: &RunRecord) {
  let store = RunStore::default_store();
  match store.save(record) {
    Ok(path) => info!(path = %path.display(), "run record saved"),
    Err(e) => print_warning(&format!("Could not save run record: {}", e)),
  }
}
