mod init;
mod plan;
mod run;
mod stages;
mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use stagehand_lib::config::PipelineConfig;
use stagehand_lib::consts::DEFAULT_BUILD_SUBDIR;
use stagehand_lib::exec::Runner;
use stagehand_lib::stage::StageContext;

pub use init::cmd_init;
pub use plan::cmd_plan;
pub use run::cmd_run;
pub use stages::cmd_stages;
pub use status::cmd_status;

/// Workspace root and build directory, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Workspace {
  pub root: PathBuf,
  pub build_dir: PathBuf,
}

impl Workspace {
  /// Fill in defaults: the current directory, and `build` under the root.
  ///
  /// A relative build directory is taken relative to the workspace root.
  pub fn resolve(root: Option<PathBuf>, build_dir: Option<PathBuf>) -> Result<Self> {
    let root = match root {
      Some(root) => root,
      None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let root = dunce::canonicalize(&root).unwrap_or(root);

    let build_dir = match build_dir {
      Some(dir) if dir.is_absolute() => dir,
      Some(dir) => root.join(dir),
      None => root.join(DEFAULT_BUILD_SUBDIR),
    };

    Ok(Self { root, build_dir })
  }

  pub fn context<'a, R: Runner>(
    &'a self,
    config: &'a PipelineConfig,
    runner: &'a R,
    dry_run: bool,
  ) -> StageContext<'a, R> {
    StageContext {
      config,
      workspace: &self.root,
      build_dir: &self.build_dir,
      runner,
      dry_run,
    }
  }
}

/// Load and validate the pipeline config for `workspace`.
fn load_config(explicit: Option<&Path>, workspace: &Workspace) -> Result<PipelineConfig> {
  PipelineConfig::discover(explicit, &workspace.root).context("Failed to load pipeline config")
}
