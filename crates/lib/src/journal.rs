//! Journaled, idempotent appends to configuration files.
//!
//! Each append remembers what the file looked like beforehand so a failed
//! provisioning step can put every touched file back the way it was.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::exec::{CommandSpec, ExecError, Runner};

/// Errors that can occur while writing or restoring a journaled file.
#[derive(Debug, Error)]
pub enum JournalError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("privileged write to {} failed: {source}", path.display())]
  Privileged { path: PathBuf, source: ExecError },
}

/// What an append did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
  Appended,
  /// The block was already present verbatim; the file was left alone.
  AlreadyPresent,
}

#[derive(Debug, Clone)]
struct JournalEntry {
  path: PathBuf,
  /// Contents before the append, `None` if the file did not exist.
  prior: Option<String>,
  privileged: bool,
}

/// Records file appends so they can be undone.
#[derive(Debug, Default)]
pub struct FileJournal {
  entries: Vec<JournalEntry>,
}

impl FileJournal {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of appends that would be undone by [`FileJournal::rollback`].
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Append `block` to `path` unless it is already there.
  ///
  /// Privileged files are written through `sudo tee -a` when the process is
  /// not elevated; everything else is written directly and made world-readable.
  pub async fn append_block<R: Runner>(
    &mut self,
    runner: &R,
    path: &Path,
    block: &str,
    privileged: bool,
  ) -> Result<AppendOutcome, JournalError> {
    let prior = read_optional(path).await?;

    if prior.as_deref().is_some_and(|content| content.contains(block)) {
      debug!(path = %path.display(), "block already present, skipping append");
      return Ok(AppendOutcome::AlreadyPresent);
    }

    let addition = match prior.as_deref() {
      Some(content) if !content.is_empty() && !content.ends_with('\n') => format!("\n{}", block),
      _ => block.to_string(),
    };

    self.entries.push(JournalEntry {
      path: path.to_path_buf(),
      prior,
      privileged,
    });

    if privileged && !runner.elevated() {
      let spec = tee_spec(path, true, &addition).privileged();
      runner.run(&spec).await.map_err(|source| JournalError::Privileged {
        path: path.to_path_buf(),
        source,
      })?;
    } else {
      append_direct(path, &addition).await?;
    }

    info!(path = %path.display(), "appended configuration block");
    Ok(AppendOutcome::Appended)
  }

  /// Undo every recorded append, newest first.
  ///
  /// Files that did not exist are removed; others get their prior contents
  /// back. Restoration keeps going past failures and returns them all.
  pub async fn rollback<R: Runner>(&mut self, runner: &R) -> Vec<JournalError> {
    let mut failures = Vec::new();

    while let Some(entry) = self.entries.pop() {
      info!(path = %entry.path.display(), existed = entry.prior.is_some(), "rolling back file");

      let result = if entry.privileged && !runner.elevated() {
        restore_privileged(runner, &entry).await
      } else {
        restore_direct(&entry).await
      };

      if let Err(e) = result {
        failures.push(e);
      }
    }

    failures
  }

  /// Forget recorded appends, keeping the files as written.
  pub fn commit(&mut self) {
    self.entries.clear();
  }
}

/// `tee` invocation equivalent to appending (or overwriting) `path` with `content`.
pub fn tee_spec(path: &Path, append: bool, content: &str) -> CommandSpec {
  let mut spec = CommandSpec::new("tee");
  if append {
    spec = spec.arg("-a");
  }
  spec.arg(path.to_string_lossy()).stdin(content)
}

async fn read_optional(path: &Path) -> Result<Option<String>, JournalError> {
  match tokio::fs::read_to_string(path).await {
    Ok(content) => Ok(Some(content)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(JournalError::Read {
      path: path.to_path_buf(),
      source,
    }),
  }
}

async fn append_direct(path: &Path, addition: &str) -> Result<(), JournalError> {
  use tokio::io::AsyncWriteExt;

  let write_err = |source: io::Error| JournalError::Write {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
  }

  let mut file = tokio::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .await
    .map_err(write_err)?;
  file.write_all(addition.as_bytes()).await.map_err(write_err)?;
  file.flush().await.map_err(write_err)?;

  set_config_mode(path).await.map_err(write_err)
}

/// Permission bits for files written directly.
#[cfg(unix)]
const CONFIG_FILE_MODE: u32 = 0o644;

#[cfg(unix)]
async fn set_config_mode(path: &Path) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mut permissions = tokio::fs::metadata(path).await?.permissions();
  let mode = permissions.mode();
  if mode & 0o7777 != CONFIG_FILE_MODE {
    permissions.set_mode((mode & !0o7777) | CONFIG_FILE_MODE);
    tokio::fs::set_permissions(path, permissions).await?;
  }
  Ok(())
}

#[cfg(not(unix))]
async fn set_config_mode(_path: &Path) -> io::Result<()> {
  Ok(())
}

async fn restore_direct(entry: &JournalEntry) -> Result<(), JournalError> {
  let write_err = |source: io::Error| JournalError::Write {
    path: entry.path.clone(),
    source,
  };

  match &entry.prior {
    Some(content) => tokio::fs::write(&entry.path, content).await.map_err(write_err),
    None => match tokio::fs::remove_file(&entry.path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(write_err(e)),
    },
  }
}

async fn restore_privileged<R: Runner>(runner: &R, entry: &JournalEntry) -> Result<(), JournalError> {
  let spec = match &entry.prior {
    Some(content) => tee_spec(&entry.path, false, content).privileged(),
    None => CommandSpec::new("rm")
      .arg("-f")
      .arg(entry.path.to_string_lossy())
      .privileged(),
  };

  runner
    .run(&spec)
    .await
    .map(|_| ())
    .map_err(|source| JournalError::Privileged {
      path: entry.path.clone(),
      source,
    })
}
