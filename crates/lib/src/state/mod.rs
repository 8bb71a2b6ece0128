//! Run record storage.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/runs/
//! ├── latest.json        # Copy of the most recent record
//! └── <id>.json          # One file per run
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::pipeline::RunRecord;
use crate::platform::paths::runs_dir;

const LATEST_FILENAME: &str = "latest.json";

#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to create run directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },

  #[error("failed to read run record {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write run record {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("malformed run record {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("failed to serialize run record: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("run not found: {0}")]
  NotFound(String),
}

/// Reads and writes run records on disk.
#[derive(Debug, Clone)]
pub struct RunStore {
  base_path: PathBuf,
}

impl RunStore {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  /// Store under the resolved data directory.
  pub fn default_store() -> Self {
    Self::new(runs_dir())
  }

  fn record_path(&self, id: &str) -> PathBuf {
    self.base_path.join(format!("{}.json", id))
  }

  /// Save `record` and make it the latest run.
  pub fn save(&self, record: &RunRecord) -> Result<PathBuf, StateError> {
    fs::create_dir_all(&self.base_path).map_err(|source| StateError::CreateDir {
      path: self.base_path.clone(),
      source,
    })?;

    let content = serde_json::to_string_pretty(record).map_err(StateError::Serialize)?;
    let path = self.record_path(&record.id);
    self.write_atomic(&path, &content)?;
    self.write_atomic(&self.base_path.join(LATEST_FILENAME), &content)?;

    debug!(path = %path.display(), "saved run record");
    Ok(path)
  }

  /// The most recent run, or `None` if nothing has run yet.
  pub fn load_latest(&self) -> Result<Option<RunRecord>, StateError> {
    match self.read(&self.base_path.join(LATEST_FILENAME)) {
      Ok(record) => Ok(Some(record)),
      Err(StateError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  pub fn load(&self, id: &str) -> Result<RunRecord, StateError> {
    match self.read(&self.record_path(id)) {
      Err(StateError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
        Err(StateError::NotFound(id.to_string()))
      }
      other => other,
    }
  }

  /// Every stored run, oldest first.
  pub fn load_all(&self) -> Result<Vec<RunRecord>, StateError> {
    self.list()?.iter().map(|id| self.load(id)).collect()
  }

  /// Ids of every stored run, oldest first.
  pub fn list(&self) -> Result<Vec<String>, StateError> {
    let entries = match fs::read_dir(&self.base_path) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(StateError::Read {
          path: self.base_path.clone(),
          source,
        });
      }
    };

    let mut ids: Vec<String> = entries
      .filter_map(Result::ok)
      .filter_map(|entry| {
        let name = entry.file_name().into_string().ok()?;
        let id = name.strip_suffix(".json")?;
        (name != LATEST_FILENAME).then(|| id.to_string())
      })
      .collect();
    ids.sort_by_key(|id| sort_key(id));
    Ok(ids)
  }

  fn read(&self, path: &Path) -> Result<RunRecord, StateError> {
    let content = fs::read_to_string(path).map_err(|source| StateError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| StateError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  fn write_atomic(&self, path: &Path, content: &str) -> Result<(), StateError> {
    let write_err = |source: io::Error| StateError::Write {
      path: path.to_path_buf(),
      source,
    };
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)
  }
}

/// Ids are `<millis>-<pid>`; order numerically by the timestamp part.
fn sort_key(id: &str) -> (u128, String) {
  let millis = id.split('-').next().and_then(|n| n.parse().ok()).unwrap_or(0);
  (millis, id.to_string())
}
