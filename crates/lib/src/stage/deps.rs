use tracing::info;

use crate::exec::{CommandSpec, Runner};

use super::{StageContext, StageError, StepContext};

/// Add the configured repositories, refresh the index and install packages.
///
/// Idempotency is whatever the package manager provides; nothing here is retried.
pub(super) async fn install<R: Runner>(ctx: &StageContext<'_, R>) -> Result<Option<String>, StageError> {
  let deps = &ctx.config.deps;

  for repository in &deps.repositories {
    let spec = CommandSpec::new("add-apt-repository")
      .arg("--yes")
      .arg(repository)
      .privileged();
    ctx.runner.run(&spec).await.step("add-repository")?;
  }

  ctx.runner.run(&apt_get().arg("update")).await.step("update")?;
  ctx
    .runner
    .run(&apt_get().args(["install", "-y"]).args(&deps.packages))
    .await
    .step("install")?;

  info!(packages = deps.packages.len(), "dependencies installed");
  Ok(Some(format!("{} package(s) installed", deps.packages.len())))
}

fn apt_get() -> CommandSpec {
  CommandSpec::new("apt-get")
    .env("DEBIAN_FRONTEND", "noninteractive")
    .privileged()
}
