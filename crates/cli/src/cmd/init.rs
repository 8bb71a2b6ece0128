//! Implementation of the `stagehand init` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use stagehand_lib::init::{InitOptions, init};

use crate::output::symbols;

/// Write a default `stagehand.toml` into `dir`.
pub fn cmd_init(dir: &Path, force: bool) -> Result<()> {
  let options = InitOptions {
    dir: dir.to_path_buf(),
    force,
  };

  let result = init(&options).context("Failed to initialize configuration")?;

  let verb = if result.overwritten { "Replaced" } else { "Created" };
  println!(
    "{} {} {}",
    symbols::SUCCESS.green(),
    verb.green().bold(),
    result.config_path.display()
  );
  println!();
  println!("{}", "Next steps:".bold());
  println!("  1. Edit {} to pin the revision and packages", result.config_path.display().to_string().cyan());
  println!("  2. Run: {}", "stagehand plan".cyan());

  Ok(())
}
