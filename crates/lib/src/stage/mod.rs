//! Provisioning stages.
//!
//! Each stage is a one-shot action that either succeeds or aborts the run.
//! Stages never run each other; ordering is the pipeline's job.

mod audio;
mod build;
mod deps;
mod smoke;
mod suite;

use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::exec::{ExecError, Runner};
use crate::journal::JournalError;

/// The five provisioning stages, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Deps,
  Build,
  Smoke,
  Audio,
  Test,
}

impl Stage {
  /// Every stage in canonical pipeline order.
  pub const ALL: [Stage; 5] = [Stage::Deps, Stage::Build, Stage::Smoke, Stage::Audio, Stage::Test];

  pub fn as_str(self) -> &'static str {
    match self {
      Stage::Deps => "deps",
      Stage::Build => "build",
      Stage::Smoke => "smoke",
      Stage::Audio => "audio",
      Stage::Test => "test",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Stage::Deps => "Install package repositories and native build dependencies",
      Stage::Build => "Clone the pinned server revision, build and install it",
      Stage::Smoke => "Check the installed server binary reports its version",
      Stage::Audio => "Register a virtual sound card and load its kernel module",
      Stage::Test => "Run the liveness probe and the test suite",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stage '{0}' (expected one of: deps, build, smoke, audio, test)")]
pub struct ParseStageError(pub String);

impl FromStr for Stage {
  type Err = ParseStageError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Stage::ALL
      .into_iter()
      .find(|stage| stage.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| ParseStageError(s.to_string()))
  }
}

/// Errors that abort a stage. `step` names the command or action that failed.
#[derive(Debug, Error)]
pub enum StageError {
  #[error("{step}: {source}")]
  Command { step: &'static str, source: ExecError },

  #[error("{step}: {source}")]
  Io { step: &'static str, source: io::Error },

  #[error("{step}: {source}")]
  Journal { step: &'static str, source: JournalError },
}

impl StageError {
  pub fn step(&self) -> &'static str {
    match self {
      StageError::Command { step, .. } | StageError::Io { step, .. } | StageError::Journal { step, .. } => *step,
    }
  }

  /// Trailing stderr of the failed command, when there is any.
  pub fn stderr_tail(&self) -> Option<&str> {
    match self {
      StageError::Command {
        source: ExecError::Failed { stderr_tail, .. },
        ..
      } if !stderr_tail.is_empty() => Some(stderr_tail.as_str()),
      _ => None,
    }
  }
}

/// Attach a step name to a lower-level error.
pub(crate) trait StepContext<T> {
  fn step(self, step: &'static str) -> Result<T, StageError>;
}

impl<T> StepContext<T> for Result<T, ExecError> {
  fn step(self, step: &'static str) -> Result<T, StageError> {
    self.map_err(|source| StageError::Command { step, source })
  }
}

impl<T> StepContext<T> for Result<T, io::Error> {
  fn step(self, step: &'static str) -> Result<T, StageError> {
    self.map_err(|source| StageError::Io { step, source })
  }
}

impl<T> StepContext<T> for Result<T, JournalError> {
  fn step(self, step: &'static str) -> Result<T, StageError> {
    self.map_err(|source| StageError::Journal { step, source })
  }
}

/// Everything a stage needs to run.
pub struct StageContext<'a, R: Runner> {
  pub config: &'a PipelineConfig,
  /// Workspace root; the test suite runs here.
  pub workspace: &'a Path,
  /// Directory holding the upstream source checkout.
  pub build_dir: &'a Path,
  pub runner: &'a R,
  /// Describe filesystem changes as commands instead of performing them.
  pub dry_run: bool,
}

/// Run a single stage.
///
/// Returns an optional one-line detail for the run summary (the server
/// version for `smoke`, the built revision for `build`, ...).
pub async fn run_stage<R: Runner>(stage: Stage, ctx: &StageContext<'_, R>) -> Result<Option<String>, StageError> {
  match stage {
    Stage::Deps => deps::install(ctx).await,
    Stage::Build => build::build(ctx).await,
    Stage::Smoke => smoke::check(ctx).await,
    Stage::Audio => audio::provision(ctx).await,
    Stage::Test => suite::run_tests(ctx).await,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stage_round_trips_through_str() {
    for stage in Stage::ALL {
      assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
    }
    assert_eq!("BUILD".parse::<Stage>().unwrap(), Stage::Build);
  }

  #[test]
  fn unknown_stage_is_rejected() {
    let err = "lint".parse::<Stage>().unwrap_err();
    assert_eq!(err, ParseStageError("lint".to_string()));
    assert!(err.to_string().contains("unknown stage 'lint'"));
  }

  #[test]
  fn canonical_order_is_sorted() {
    let mut sorted = Stage::ALL;
    sorted.sort();
    assert_eq!(sorted, Stage::ALL);
  }

  #[test]
  fn stage_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Stage::Smoke).unwrap(), "\"smoke\"");
  }

  #[test]
  fn stage_error_exposes_step_and_stderr() {
    let err = Err::<(), _>(ExecError::Failed {
      cmd: "git checkout nope".to_string(),
      code: Some(1),
      stderr_tail: "error: pathspec 'nope' did not match".to_string(),
    })
    .step("checkout")
    .unwrap_err();

    assert_eq!(err.step(), "checkout");
    assert_eq!(err.stderr_tail(), Some("error: pathspec 'nope' did not match"));
    assert!(err.to_string().starts_with("checkout: command failed"));
  }
}
