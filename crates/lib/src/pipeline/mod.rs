//! Sequential, fail-fast pipeline execution.
//!
//! Stages run one after another. The first failure aborts the run and every
//! later stage is recorded as skipped.

mod types;

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::exec::Runner;
use crate::stage::{Stage, StageContext, run_stage};

pub use types::{RunRecord, StageOutcome, StageStatus};

/// Resolve the stages to run.
///
/// No request means the whole pipeline in canonical order. Otherwise stages
/// run in the order given, each at most once.
pub fn resolve_stages(requested: &[Stage]) -> Vec<Stage> {
  if requested.is_empty() {
    return Stage::ALL.to_vec();
  }

  let mut stages = Vec::with_capacity(requested.len());
  for stage in requested {
    if !stages.contains(stage) {
      stages.push(*stage);
    }
  }
  stages
}

/// Run `stages` in order, stopping at the first failure.
pub async fn run_pipeline<R: Runner>(stages: &[Stage], ctx: &StageContext<'_, R>) -> RunRecord {
  let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
  let id = format!("{}-{}", now.as_millis(), std::process::id());

  info!(
    run = %id,
    stages = %stages.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(","),
    dry_run = ctx.dry_run,
    "starting pipeline"
  );

  let mut outcomes = Vec::with_capacity(stages.len());
  let mut aborted = false;

  for &stage in stages {
    if aborted {
      warn!(stage = %stage, "skipping stage after earlier failure");
      outcomes.push(StageOutcome::skipped(stage));
      continue;
    }

    info!(stage = %stage, "starting stage");
    let started = Instant::now();
    let result = run_stage(stage, ctx).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
      Ok(detail) => {
        info!(stage = %stage, duration_ms, "stage succeeded");
        outcomes.push(StageOutcome {
          stage,
          status: StageStatus::Succeeded,
          duration_ms,
          detail,
        });
      }
      Err(e) => {
        error!(stage = %stage, step = e.step(), error = %e, "stage failed");
        if let Some(tail) = e.stderr_tail() {
          for line in tail.lines() {
            error!(stage = %stage, "{}", line);
          }
        }
        outcomes.push(StageOutcome {
          stage,
          status: StageStatus::Failed {
            step: e.step().to_string(),
            error: e.to_string(),
          },
          duration_ms,
          detail: None,
        });
        aborted = true;
      }
    }
  }

  let record = RunRecord {
    id,
    started_at: now.as_secs(),
    dry_run: ctx.dry_run,
    revision: ctx.config.source.revision.clone(),
    stages: outcomes,
  };

  info!(
    run = %record.id,
    success = record.is_success(),
    succeeded = record.succeeded_count(),
    skipped = record.skipped_count(),
    "pipeline complete"
  );

  record
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PipelineConfig;
  use crate::exec::RecordingRunner;
  use std::path::Path;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  #[test]
  fn resolve_defaults_to_all_stages() {
    assert_eq!(resolve_stages(&[]), Stage::ALL.to_vec());
  }

  #[test]
  fn resolve_keeps_given_order_and_dedupes() {
    assert_eq!(
      resolve_stages(&[Stage::Smoke, Stage::Build, Stage::Smoke]),
      vec![Stage::Smoke, Stage::Build]
    );
  }

  #[tokio::test]
  async fn dry_run_of_full_pipeline_succeeds() {
    let temp = TempDir::new().unwrap();
    let build_dir = temp.path().join("build");
    let config = PipelineConfig::default();
    let runner = RecordingRunner::new(false);
    let ctx = StageContext {
      config: &config,
      workspace: temp.path(),
      build_dir: &build_dir,
      runner: &runner,
      dry_run: true,
    };

    let record = run_pipeline(&Stage::ALL, &ctx).await;

    assert!(record.is_success());
    assert!(record.dry_run);
    assert_eq!(record.revision, "Version-3.9.3");
    assert_eq!(
      record.stages.iter().map(|o| o.stage).collect::<Vec<_>>(),
      Stage::ALL.to_vec()
    );
    assert!(!build_dir.exists());

    let programs: Vec<String> = runner.calls().into_iter().map(|spec| spec.program).collect();
    let first_git = programs.iter().position(|p| p == "git").unwrap();
    let last_apt = programs.iter().rposition(|p| p == "apt-get").unwrap();
    let smoke = programs.iter().position(|p| p == "scsynth").unwrap();
    let modprobe = programs.iter().position(|p| p == "modprobe").unwrap();
    let pytest = programs.iter().position(|p| p == "pytest").unwrap();
    assert!(last_apt < first_git);
    assert!(first_git < smoke && smoke < modprobe && modprobe < pytest);
  }

  #[tokio::test]
  #[traced_test]
  async fn failure_aborts_and_skips_later_stages() {
    let temp = TempDir::new().unwrap();
    let config = PipelineConfig::default();
    let runner = RecordingRunner::new(false).fail_when(|spec| spec.program == "scsynth");
    let ctx = StageContext {
      config: &config,
      workspace: temp.path(),
      build_dir: &temp.path().join("build"),
      runner: &runner,
      dry_run: true,
    };

    let record = run_pipeline(&[Stage::Smoke, Stage::Audio, Stage::Test], &ctx).await;

    assert!(!record.is_success());
    assert_eq!(record.failed_stage().map(|o| o.stage), Some(Stage::Smoke));
    assert_eq!(record.stages[1].status, StageStatus::Skipped);
    assert_eq!(record.stages[2].status, StageStatus::Skipped);
    assert_eq!(runner.calls().len(), 1);
    assert!(logs_contain("stages=smoke,audio,test"));
    assert!(logs_contain("stage failed"));
    assert!(logs_contain("skipping stage after earlier failure"));
  }

  #[tokio::test]
  async fn single_stage_runs_alone() {
    let config = PipelineConfig::default();
    let runner = RecordingRunner::new(false);
    let ctx = StageContext {
      config: &config,
      workspace: Path::new("/work"),
      build_dir: Path::new("/work/build"),
      runner: &runner,
      dry_run: true,
    };

    let record = run_pipeline(&[Stage::Smoke], &ctx).await;

    assert!(record.is_success());
    assert_eq!(record.stages.len(), 1);
    assert_eq!(runner.command_lines(), vec!["scsynth -v"]);
  }
}
