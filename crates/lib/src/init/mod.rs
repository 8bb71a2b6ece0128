//! Scaffold a `stagehand.toml` for a workspace.

mod templates;

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::consts::CONFIG_FILENAME;

pub use templates::CONFIG_TEMPLATE;

/// Errors that can occur during initialization.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("file already exists: {} (use --force to overwrite)", path.display())]
  PathExists { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },
}

/// Options for `stagehand init`.
#[derive(Debug, Clone)]
pub struct InitOptions {
  /// Directory that receives the config file; created if missing.
  pub dir: PathBuf,
  /// Replace an existing config file.
  pub force: bool,
}

#[derive(Debug)]
pub struct InitResult {
  pub config_path: PathBuf,
  /// An existing file was replaced.
  pub overwritten: bool,
}

/// Write the default config into `options.dir`.
pub fn init(options: &InitOptions) -> Result<InitResult, InitError> {
  fs::create_dir_all(&options.dir).map_err(|source| InitError::CreateDir {
    path: options.dir.clone(),
    source,
  })?;

  let dir = dunce::canonicalize(&options.dir).unwrap_or_else(|_| options.dir.clone());
  let config_path = dir.join(CONFIG_FILENAME);
  let overwritten = config_path.exists();

  if overwritten && !options.force {
    return Err(InitError::PathExists { path: config_path });
  }

  fs::write(&config_path, CONFIG_TEMPLATE).map_err(|source| InitError::WriteFile {
    path: config_path.clone(),
    source,
  })?;

  info!(path = %config_path.display(), overwritten, "wrote pipeline config");
  Ok(InitResult {
    config_path,
    overwritten,
  })
}
