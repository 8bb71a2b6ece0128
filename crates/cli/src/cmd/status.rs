//! Status command implementation.
//!
//! Displays the most recent run record, or a one-line history of all runs.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use stagehand_lib::state::RunStore;

use crate::output::{format_timestamp, print_info, print_json, print_record, print_stat, symbols};

pub fn cmd_status(all: bool, json: bool) -> Result<()> {
  let store = RunStore::default_store();

  if all {
    return print_history(&store, json);
  }

  let Some(record) = store.load_latest().context("Failed to load run record")? else {
    if json {
      println!("null");
    } else {
      print_info("No runs recorded yet. Run 'stagehand run' to start one.");
    }
    return Ok(());
  };

  if json {
    return print_json(&record);
  }

  print_info(&format!("Last run: {}", record.id));
  print_stat("Started", &format_timestamp(record.started_at));
  print_stat("Revision", &record.revision);
  if record.dry_run {
    print_stat("Mode", "dry run");
  }
  println!();
  print_record(&record);

  Ok(())
}

fn print_history(store: &RunStore, json: bool) -> Result<()> {
  let records = store.load_all().context("Failed to load run records")?;

  if json {
    return print_json(&records);
  }
  if records.is_empty() {
    print_info("No runs recorded yet. Run 'stagehand run' to start one.");
    return Ok(());
  }

  for record in &records {
    let symbol = if record.is_success() {
      symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    } else {
      symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
    };
    let verdict = match record.failed_stage() {
      Some(failed) => format!("failed at {}", failed.stage),
      None => format!("{} stage(s) succeeded", record.succeeded_count()),
    };
    let mode = if record.dry_run { " (dry run)" } else { "" };
    println!(
      "{} {}  {}  {}  {}{}",
      symbol,
      record.id,
      format_timestamp(record.started_at),
      record.revision,
      verdict,
      mode
    );
  }

  Ok(())
}
