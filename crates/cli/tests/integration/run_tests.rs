//! Run command integration tests.

use predicates::prelude::*;

use super::common::{HARMLESS_CONFIG, MISSING_BINARY_CONFIG, TestEnv};

#[test]
fn run_smoke_reports_version() {
  let env = TestEnv::with_config(HARMLESS_CONFIG);

  env
    .stagehand_cmd()
    .args(["run", "smoke"])
    .assert()
    .success()
    .stdout(predicate::str::contains("scsynth 3.9.3"))
    .stdout(predicate::str::contains("1 stage(s) succeeded"));
}

#[test]
fn run_smoke_and_test_in_order() {
  let env = TestEnv::with_config(HARMLESS_CONFIG);

  let assert = env.stagehand_cmd().args(["run", "test", "smoke", "--json"]).assert().success();

  let record: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
  let stages: Vec<&str> = record["stages"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["stage"].as_str().unwrap())
    .collect();
  assert_eq!(stages, vec!["test", "smoke"]);
  assert_eq!(record["dry_run"], false);
}

#[test]
fn missing_binary_fails_and_skips_later_stages() {
  let env = TestEnv::with_config(MISSING_BINARY_CONFIG);

  env
    .stagehand_cmd()
    .args(["run", "smoke", "test"])
    .assert()
    .failure()
    .code(1)
    .stdout(predicate::str::contains("failed at version"))
    .stdout(predicate::str::contains("skipped"));
}

#[test]
fn missing_binary_json_record() {
  let env = TestEnv::with_config(MISSING_BINARY_CONFIG);

  let assert = env
    .stagehand_cmd()
    .args(["run", "smoke", "test", "--json"])
    .assert()
    .failure();

  let record: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
  assert_eq!(record["stages"][0]["status"]["status"], "failed");
  assert_eq!(record["stages"][0]["status"]["step"], "version");
  assert!(
    record["stages"][0]["status"]["error"]
      .as_str()
      .unwrap()
      .contains("stagehand-missing-server")
  );
  assert_eq!(record["stages"][1]["status"]["status"], "skipped");
}

#[test]
fn dry_run_lists_commands_without_changing_files() {
  let env = TestEnv::empty();
  let home = env.temp.path().join("home");
  std::fs::create_dir_all(&home).unwrap();

  env
    .stagehand_cmd()
    .env("HOME", &home)
    .arg("run")
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"))
    .stdout(predicate::str::contains("apt-get install -y"))
    .stdout(predicate::str::contains("git clone"))
    .stdout(predicate::str::contains("modprobe snd-dummy"))
    .stdout(predicate::str::contains("5 stage(s) succeeded"));

  assert!(!home.join(".asoundrc").exists());
  assert!(!env.workspace().join("build").exists());
}

#[test]
fn run_saves_record() {
  let env = TestEnv::with_config(HARMLESS_CONFIG);

  env.stagehand_cmd().args(["run", "smoke"]).assert().success();

  let latest = env.runs_path().join("latest.json");
  assert!(latest.exists());
  let record: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(latest).unwrap()).unwrap();
  let id = record["id"].as_str().unwrap();
  assert!(env.runs_path().join(format!("{}.json", id)).exists());
}

#[test]
fn explicit_config_flag_overrides_workspace_file() {
  let env = TestEnv::with_config(MISSING_BINARY_CONFIG);
  env.write_file("alt.toml", HARMLESS_CONFIG);

  env
    .stagehand_cmd()
    .args(["run", "smoke", "--config"])
    .arg(env.workspace().join("alt.toml"))
    .assert()
    .success();
}

#[test]
fn missing_explicit_config_fails() {
  let env = TestEnv::empty();

  env
    .stagehand_cmd()
    .args(["run", "smoke", "--config", "does-not-exist.toml"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load pipeline config"));
}
