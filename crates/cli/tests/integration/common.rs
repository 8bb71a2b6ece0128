//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own workspace, build directory, and data directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Workspace whose `stagehand.toml` holds `config`.
  pub fn with_config(config: &str) -> Self {
    let env = Self::empty();
    env.write_file("stagehand.toml", config);
    env
  }

  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the workspace.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn workspace(&self) -> PathBuf {
    let p = self.temp.path().to_path_buf();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Data path for run records.
  pub fn data_path(&self) -> PathBuf {
    let p = self.temp.path().join("data");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn runs_path(&self) -> PathBuf {
    self.data_path().join("runs")
  }

  /// Get a pre-configured Command for the stagehand binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `STAGEHAND_WORKSPACE`: the temp directory
  /// - `STAGEHAND_BUILD_DIR`: `build` under it
  /// - `STAGEHAND_DATA_DIR`: isolated run records
  pub fn stagehand_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("stagehand");
    cmd.env("STAGEHAND_WORKSPACE", self.workspace());
    cmd.env("STAGEHAND_BUILD_DIR", self.workspace().join("build"));
    cmd.env("STAGEHAND_DATA_DIR", self.data_path());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}

/// Smoke and test stages backed by commands every unix host has.
pub const HARMLESS_CONFIG: &str = r#"
[smoke]
binary = "echo"
version_flag = "scsynth 3.9.3"

[test]
python = "true"
runner = "true"
"#;

/// Smoke stage pointing at a binary that does not exist.
pub const MISSING_BINARY_CONFIG: &str = r#"
[smoke]
binary = "stagehand-missing-server"

[test]
python = "true"
runner = "true"
"#;
