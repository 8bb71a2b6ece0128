//! Run records: the outcome of one pipeline run.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Outcome of a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
  Succeeded,
  Failed { step: String, error: String },
  /// Not attempted because an earlier stage failed.
  Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
  pub stage: Stage,
  pub status: StageStatus,
  pub duration_ms: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

impl StageOutcome {
  pub fn skipped(stage: Stage) -> Self {
    Self {
      stage,
      status: StageStatus::Skipped,
      duration_ms: 0,
      detail: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == StageStatus::Succeeded
  }
}

/// Summary of one `stagehand run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
  pub id: String,
  /// Unix timestamp (seconds) at which the run started.
  pub started_at: u64,
  pub dry_run: bool,
  /// Pinned server revision the run was configured with.
  pub revision: String,
  pub stages: Vec<StageOutcome>,
}

impl RunRecord {
  /// True when every requested stage succeeded.
  pub fn is_success(&self) -> bool {
    self.stages.iter().all(StageOutcome::is_success)
  }

  /// The stage that aborted the run, if any.
  pub fn failed_stage(&self) -> Option<&StageOutcome> {
    self
      .stages
      .iter()
      .find(|outcome| matches!(outcome.status, StageStatus::Failed { .. }))
  }

  pub fn succeeded_count(&self) -> usize {
    self.stages.iter().filter(|o| o.is_success()).count()
  }

  pub fn skipped_count(&self) -> usize {
    self.stages.iter().filter(|o| o.status == StageStatus::Skipped).count()
  }

  /// Total time spent in stages, in milliseconds.
  pub fn total_duration_ms(&self) -> u64 {
    self.stages.iter().map(|o| o.duration_ms).sum()
  }
}
