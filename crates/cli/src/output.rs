//! CLI output formatting utilities.
//!
//! Colored status lines, run summaries, and human-readable durations.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use stagehand_lib::pipeline::{RunRecord, StageOutcome, StageStatus};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIPPED: &str = "-";
}

pub fn format_duration_ms(ms: u64) -> String {
  humantime::format_duration(Duration::from_millis(ms)).to_string()
}

/// Render a unix timestamp as RFC 3339 (UTC, second precision).
pub fn format_timestamp(secs: u64) -> String {
  humantime::format_rfc3339_seconds(UNIX_EPOCH + Duration::from_secs(secs)).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// One summary line per stage.
pub fn print_outcome(outcome: &StageOutcome) {
  let name = format!("{:<6}", outcome.stage.as_str());
  match &outcome.status {
    StageStatus::Succeeded => {
      let detail = outcome.detail.as_deref().map(|d| format!(" {} {}", symbols::ARROW, d));
      println!(
        "  {} {} {}{}",
        symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
        name,
        format!("({})", format_duration_ms(outcome.duration_ms)).if_supports_color(Stream::Stdout, |s| s.dimmed()),
        detail.unwrap_or_default()
      );
    }
    StageStatus::Failed { step, error } => {
      println!(
        "  {} {} {}",
        symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
        name,
        format!("failed at {}", step).if_supports_color(Stream::Stdout, |s| s.red())
      );
      println!("      {}", error);
    }
    StageStatus::Skipped => {
      println!(
        "  {} {} {}",
        symbols::SKIPPED.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        name,
        "skipped".if_supports_color(Stream::Stdout, |s| s.dimmed())
      );
    }
  }
}

/// Stage lines followed by the overall verdict.
pub fn print_record(record: &RunRecord) {
  for outcome in &record.stages {
    print_outcome(outcome);
  }
  println!();

  let total = format_duration_ms(record.total_duration_ms());
  match record.failed_stage() {
    None => print_success(&format!(
      "{} stage(s) succeeded in {}",
      record.succeeded_count(),
      total
    )),
    Some(failed) => print_error(&format!(
      "Stage '{}' failed; {} stage(s) skipped",
      failed.stage,
      record.skipped_count()
    )),
  }
}
