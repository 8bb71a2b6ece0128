use tracing::info;

use crate::consts::CMAKE_BUILD_SUBDIR;
use crate::exec::{CommandSpec, Runner};
use crate::platform::available_jobs;

use super::{StageContext, StageError, StepContext};

/// Check out the pinned revision, then configure, compile and install it.
///
/// An existing checkout is reused and fetched instead of cloned again. The
/// revision is checked out before anything is compiled, so a bad tag fails
/// early.
pub(super) async fn build<R: Runner>(ctx: &StageContext<'_, R>) -> Result<Option<String>, StageError> {
  let source = &ctx.config.source;
  let checkout = ctx.build_dir.join(&source.checkout_dir);
  let runner = ctx.runner;

  if !ctx.dry_run {
    tokio::fs::create_dir_all(ctx.build_dir).await.step("prepare")?;
  }

  if checkout.join(".git").exists() {
    info!(path = %checkout.display(), "reusing existing checkout");
    let spec = CommandSpec::new("git").args(["fetch", "--tags", "origin"]).cwd(&checkout);
    runner.run(&spec).await.step("fetch")?;
  } else {
    let spec = CommandSpec::new("git")
      .arg("clone")
      .arg(&source.url)
      .arg(checkout.to_string_lossy())
      .cwd(ctx.build_dir);
    runner.run(&spec).await.step("clone")?;
  }

  let spec = CommandSpec::new("git").arg("checkout").arg(&source.revision).cwd(&checkout);
  runner.run(&spec).await.step("checkout")?;

  let spec = CommandSpec::new("git")
    .args(["submodule", "update", "--init", "--recursive"])
    .cwd(&checkout);
  runner.run(&spec).await.step("submodules")?;

  let cmake_dir = checkout.join(CMAKE_BUILD_SUBDIR);
  if !ctx.dry_run {
    tokio::fs::create_dir_all(&cmake_dir).await.step("configure")?;
  }

  let spec = CommandSpec::new("cmake").args(&source.cmake_flags).arg("..").cwd(&cmake_dir);
  runner.run(&spec).await.step("configure")?;

  let jobs = source.jobs.unwrap_or_else(available_jobs);
  let spec = CommandSpec::new("make").arg(format!("-j{}", jobs)).cwd(&cmake_dir);
  runner.run(&spec).await.step("compile")?;

  let spec = CommandSpec::new("make").arg("install").cwd(&cmake_dir).privileged();
  runner.run(&spec).await.step("install")?;
  runner.run(&CommandSpec::new("ldconfig").privileged()).await.step("install")?;

  info!(revision = %source.revision, "server built and installed");
  Ok(Some(format!("installed {}", source.revision)))
}
