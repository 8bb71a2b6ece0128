//! Implementation of the `stagehand plan` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use stagehand_lib::exec::RecordingRunner;
use stagehand_lib::pipeline::resolve_stages;
use stagehand_lib::platform;
use stagehand_lib::stage::{Stage, run_stage};

use super::{Workspace, load_config};

/// Print the command lines each stage would run, without running anything.
pub fn cmd_plan(workspace: &Workspace, config_path: Option<&Path>, stages: &[Stage]) -> Result<()> {
  let config = load_config(config_path, workspace)?;
  let elevated = platform::is_elevated();
  let runner = RecordingRunner::new(elevated);
  let ctx = workspace.context(&config, &runner, true);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  for (index, stage) in resolve_stages(stages).into_iter().enumerate() {
    rt.block_on(run_stage(stage, &ctx))
      .with_context(|| format!("Failed to plan stage '{}'", stage))?;

    if index > 0 {
      println!();
    }
    println!(
      "{} {}",
      stage.as_str().if_supports_color(Stream::Stdout, |s| s.bold()),
      stage.description().if_supports_color(Stream::Stdout, |s| s.dimmed())
    );

    for spec in runner.take_calls() {
      let line = spec.command_line(elevated);
      match &spec.cwd {
        Some(cwd) => println!(
          "  {} {}",
          line,
          format!("(in {})", cwd.display()).if_supports_color(Stream::Stdout, |s| s.dimmed())
        ),
        None => println!("  {}", line),
      }
    }
  }

  Ok(())
}
