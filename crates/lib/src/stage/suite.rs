use std::path::Path;

use tracing::info;

use crate::config::TestConfig;
use crate::exec::{CommandSpec, Runner};

use super::{StageContext, StageError, StepContext};

/// Run the liveness probe, then the test suite, both from the workspace root.
pub(super) async fn run_tests<R: Runner>(ctx: &StageContext<'_, R>) -> Result<Option<String>, StageError> {
  let test = &ctx.config.test;

  let probe = CommandSpec::new(&test.python)
    .arg("-c")
    .arg(&test.probe)
    .cwd(ctx.workspace);
  let output = ctx.runner.run(&probe).await.step("probe")?;
  if let Some(server) = output.first_line() {
    info!(server = %server, "liveness probe passed");
  }

  ctx
    .runner
    .run(&suite_spec(test, ctx.workspace))
    .await
    .step("suite")?;

  Ok(Some(format!("{} target(s) passed", test.targets.len())))
}

/// Test-suite invocation: slowest-test report, per-test timeout, then targets.
fn suite_spec(test: &TestConfig, workspace: &Path) -> CommandSpec {
  CommandSpec::new(&test.runner)
    .arg(format!("--durations={}", test.durations))
    .arg(format!("--timeout={}", test.timeout_secs))
    .args(&test.targets)
    .cwd(workspace)
}
