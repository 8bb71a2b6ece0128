use tracing::{info, warn};

use crate::exec::{CommandSpec, Runner};

use super::{StageContext, StageError, StepContext};

/// Ask the installed server binary for its version.
///
/// This is the only correctness gate on the build: a missing or broken
/// binary fails the stage.
pub(super) async fn check<R: Runner>(ctx: &StageContext<'_, R>) -> Result<Option<String>, StageError> {
  let smoke = &ctx.config.smoke;
  let spec = CommandSpec::new(&smoke.binary).arg(&smoke.version_flag);
  let output = ctx.runner.run(&spec).await.step("version")?;

  let version = output.first_line().map(str::to_string);
  match &version {
    Some(version) => info!(binary = %smoke.binary, version = %version, "server binary responds"),
    None => warn!(binary = %smoke.binary, "server binary printed no version"),
  }

  Ok(version)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PipelineConfig;
  use crate::exec::{ExecError, ProcessRunner, RecordingRunner};
  use std::path::Path;

  #[tokio::test]
  async fn reports_first_line_as_version() {
    let config = PipelineConfig::default();
    let runner = RecordingRunner::new(false).respond("scsynth", "scsynth 3.9.3 (Built from tag 'Version-3.9.3')\n");
    let ctx = StageContext {
      config: &config,
      workspace: Path::new("."),
      build_dir: Path::new("build"),
      runner: &runner,
      dry_run: false,
    };

    let version = check(&ctx).await.unwrap();

    assert_eq!(version.as_deref(), Some("scsynth 3.9.3 (Built from tag 'Version-3.9.3')"));
    assert_eq!(runner.command_lines(), vec!["scsynth -v"]);
  }

  #[tokio::test]
  async fn missing_binary_fails() {
    let mut config = PipelineConfig::default();
    config.smoke.binary = "stagehand-missing-server".to_string();
    let runner = ProcessRunner::new(false);
    let ctx = StageContext {
      config: &config,
      workspace: Path::new("."),
      build_dir: Path::new("build"),
      runner: &runner,
      dry_run: false,
    };

    let err = check(&ctx).await.unwrap_err();

    assert_eq!(err.step(), "version");
    assert!(matches!(
      err,
      StageError::Command {
        source: ExecError::NotFound { .. },
        ..
      }
    ));
  }

  #[tokio::test]
  async fn runnable_binary_passes() {
    let mut config = PipelineConfig::default();
    config.smoke.binary = "echo".to_string();
    config.smoke.version_flag = "server 1.0".to_string();
    let runner = ProcessRunner::new(false);
    let ctx = StageContext {
      config: &config,
      workspace: Path::new("."),
      build_dir: Path::new("build"),
      runner: &runner,
      dry_run: false,
    };

    assert_eq!(check(&ctx).await.unwrap().as_deref(), Some("server 1.0"));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn non_executable_binary_fails() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::TempDir::new().unwrap();
    let binary = temp.path().join("scsynth");
    std::fs::write(&binary, "#!/bin/sh\necho scsynth 3.9.3\n").unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();

    let mut config = PipelineConfig::default();
    config.smoke.binary = binary.to_string_lossy().into_owned();
    let runner = ProcessRunner::new(false);
    let ctx = StageContext {
      config: &config,
      workspace: temp.path(),
      build_dir: temp.path(),
      runner: &runner,
      dry_run: false,
    };

    let err = check(&ctx).await.unwrap_err();

    assert_eq!(err.step(), "version");
    assert!(matches!(
      err,
      StageError::Command {
        source: ExecError::Spawn { .. },
        ..
      }
    ));
  }
}
