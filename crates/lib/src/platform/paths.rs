use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, DATA_DIR_ENV};

/// Returns the user's home directory, if `HOME` is set.
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").filter(|h| !h.is_empty()).map(PathBuf::from)
}

/// Returns the directory for run records and other data.
///
/// `STAGEHAND_DATA_DIR` wins, then `$XDG_DATA_HOME/stagehand`, then
/// `~/.local/share/stagehand`. Without a home directory the data lives in
/// `.stagehand` under the current directory.
pub fn data_dir() -> PathBuf {
  if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
    return PathBuf::from(dir);
  }

  let data_home = std::env::var_os("XDG_DATA_HOME")
    .filter(|d| !d.is_empty())
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|home| home.join(".local").join("share")));

  match data_home {
    Some(base) => base.join(APP_NAME),
    None => PathBuf::from(format!(".{}", APP_NAME)),
  }
}

/// Directory holding run records.
pub fn runs_dir() -> PathBuf {
  data_dir().join("runs")
}

/// Expand a leading `~` to the home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
  let Ok(rest) = path.strip_prefix("~") else {
    return path.to_path_buf();
  };

  match home_dir() {
    Some(home) => home.join(rest),
    None => path.to_path_buf(),
  }
}
