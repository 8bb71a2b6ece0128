//! Pipeline configuration loading and validation.
//!
//! Configuration comes from an optional TOML file layered over built-in
//! defaults. Validation runs once, before any stage touches the system.

mod types;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::CONFIG_FILENAME;

pub use types::{AudioConfig, DEFAULT_PROBE, DepsConfig, PipelineConfig, SmokeConfig, SourceConfig, TestConfig};

/// Errors that can occur while loading a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse config {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("invalid config value for {field}: {reason}")]
  Invalid { field: &'static str, reason: String },
}

impl PipelineConfig {
  /// Parse a configuration from TOML text. Missing fields take their defaults.
  pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: origin.to_path_buf(),
      source,
    })
  }

  /// Load and validate a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = Self::from_toml_str(&content, path)?;
    config.validate()?;
    info!(path = %path.display(), "loaded pipeline config");
    Ok(config)
  }

  /// Resolve the configuration for a run.
  ///
  /// An explicit path must exist. Otherwise `stagehand.toml` in the workspace
  /// is used when present, and the built-in defaults when it is not.
  pub fn discover(explicit: Option<&Path>, workspace: &Path) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load(path);
    }

    let candidate = workspace.join(CONFIG_FILENAME);
    if candidate.is_file() {
      return Self::load(&candidate);
    }

    debug!(workspace = %workspace.display(), "no config file found, using defaults");
    let config = Self::default();
    config.validate()?;
    Ok(config)
  }

  /// Check invariants that every stage relies on.
  pub fn validate(&self) -> Result<(), ConfigError> {
    validate_revision(&self.source.revision)?;
    require_non_empty("source.url", &self.source.url)?;
    require_non_empty("smoke.binary", &self.smoke.binary)?;
    require_non_empty("audio.module", &self.audio.module)?;
    require_non_empty("test.python", &self.test.python)?;
    require_non_empty("test.runner", &self.test.runner)?;

    if self.deps.packages.is_empty() {
      return Err(ConfigError::Invalid {
        field: "deps.packages",
        reason: "at least one package is required".to_string(),
      });
    }
    if self.test.targets.is_empty() {
      return Err(ConfigError::Invalid {
        field: "test.targets",
        reason: "at least one test target is required".to_string(),
      });
    }
    if self.test.timeout_secs == 0 {
      return Err(ConfigError::Invalid {
        field: "test.timeout_secs",
        reason: "must be greater than zero".to_string(),
      });
    }
    if self.source.jobs == Some(0) {
      return Err(ConfigError::Invalid {
        field: "source.jobs",
        reason: "must be greater than zero".to_string(),
      });
    }
    if self.stage_timeout_secs == Some(0) {
      return Err(ConfigError::Invalid {
        field: "stage_timeout_secs",
        reason: "must be greater than zero".to_string(),
      });
    }

    Ok(())
  }
}

/// A revision must name a single ref that git cannot mistake for an option.
fn validate_revision(revision: &str) -> Result<(), ConfigError> {
  let reason = if revision.is_empty() {
    Some("must not be empty")
  } else if revision.chars().any(char::is_whitespace) {
    Some("must not contain whitespace")
  } else if revision.starts_with('-') {
    Some("must not start with '-'")
  } else {
    None
  };

  match reason {
    Some(reason) => Err(ConfigError::Invalid {
      field: "source.revision",
      reason: format!("{reason} (got {revision:?})"),
    }),
    None => Ok(()),
  }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
  if value.trim().is_empty() {
    return Err(ConfigError::Invalid {
      field,
      reason: "must not be empty".to_string(),
    });
  }
  Ok(())
}
