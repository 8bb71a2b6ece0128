use std::path::Path;

use tracing::{info, warn};

use crate::exec::{CommandSpec, Runner};
use crate::journal::{AppendOutcome, FileJournal, tee_spec};
use crate::platform::paths::expand_home;

use super::{StageContext, StageError, StepContext};

/// Register a virtual sound card for hosts without audio hardware.
///
/// Writes the sound-server block and the module alias block, then loads the
/// module. With `rollback_on_failure`, files touched before a failure are
/// restored before the error is returned.
pub(super) async fn provision<R: Runner>(ctx: &StageContext<'_, R>) -> Result<Option<String>, StageError> {
  let audio = &ctx.config.audio;
  let asoundrc = expand_home(&audio.asoundrc);
  let modprobe_conf = expand_home(&audio.modprobe_conf);

  if ctx.dry_run {
    let runner = ctx.runner;
    runner
      .run(&tee_spec(&asoundrc, true, &audio.asoundrc_block()))
      .await
      .step("write-asoundrc")?;
    runner
      .run(&tee_spec(&modprobe_conf, true, &audio.modprobe_block()).privileged())
      .await
      .step("write-modprobe-conf")?;
    runner.run(&modprobe_spec(&audio.module)).await.step("load-module")?;
    return Ok(None);
  }

  let mut journal = FileJournal::new();
  match write_and_load(ctx, &mut journal, &asoundrc, &modprobe_conf).await {
    Ok(detail) => {
      journal.commit();
      Ok(Some(detail))
    }
    Err(e) => {
      if audio.rollback_on_failure && !journal.is_empty() {
        warn!(error = %e, files = journal.len(), "audio provisioning failed, restoring config files");
        for failure in journal.rollback(ctx.runner).await {
          warn!(error = %failure, "could not restore config file");
        }
      }
      Err(e)
    }
  }
}

async fn write_and_load<R: Runner>(
  ctx: &StageContext<'_, R>,
  journal: &mut FileJournal,
  asoundrc: &Path,
  modprobe_conf: &Path,
) -> Result<String, StageError> {
  let audio = &ctx.config.audio;

  let outcome = journal
    .append_block(ctx.runner, asoundrc, &audio.asoundrc_block(), false)
    .await
    .step("write-asoundrc")?;
  log_outcome(asoundrc, outcome);

  let outcome = journal
    .append_block(ctx.runner, modprobe_conf, &audio.modprobe_block(), true)
    .await
    .step("write-modprobe-conf")?;
  log_outcome(modprobe_conf, outcome);

  ctx
    .runner
    .run(&modprobe_spec(&audio.module))
    .await
    .step("load-module")?;

  info!(module = %audio.module, card = audio.card_index, "virtual sound card ready");
  Ok(format!("{} registered as card {}", audio.module, audio.card_index))
}

fn modprobe_spec(module: &str) -> CommandSpec {
  CommandSpec::new("modprobe").arg(module).privileged()
}

fn log_outcome(path: &Path, outcome: AppendOutcome) {
  if outcome == AppendOutcome::AlreadyPresent {
    info!(path = %path.display(), "registration already present");
  }
}
