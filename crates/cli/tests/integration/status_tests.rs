//! Status command integration tests.

use predicates::prelude::*;

use super::common::{HARMLESS_CONFIG, MISSING_BINARY_CONFIG, TestEnv};

#[test]
fn status_shows_latest_run() {
  let env = TestEnv::with_config(HARMLESS_CONFIG);
  env.stagehand_cmd().args(["run", "smoke"]).assert().success();

  env
    .stagehand_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("Last run"))
    .stdout(predicate::str::contains("Version-3.9.3"))
    .stdout(predicate::str::contains("smoke"));
}

#[test]
fn status_json_reflects_failure() {
  let env = TestEnv::with_config(MISSING_BINARY_CONFIG);
  env.stagehand_cmd().args(["run", "smoke"]).assert().failure();

  let assert = env.stagehand_cmd().args(["status", "--json"]).assert().success();

  let record: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
  assert_eq!(record["stages"][0]["stage"], "smoke");
  assert_eq!(record["stages"][0]["status"]["status"], "failed");
}

#[test]
fn status_json_without_runs_is_null() {
  let env = TestEnv::empty();

  env
    .stagehand_cmd()
    .args(["status", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::diff("null\n"));
}

#[test]
fn status_all_lists_every_run() {
  let env = TestEnv::with_config(HARMLESS_CONFIG);
  env.stagehand_cmd().args(["run", "smoke"]).assert().success();
  env.write_file("stagehand.toml", MISSING_BINARY_CONFIG);
  env.stagehand_cmd().args(["run", "smoke"]).assert().failure();

  let assert = env.stagehand_cmd().args(["status", "--all", "--json"]).assert().success();
  let records: Vec<serde_json::Value> = serde_json::from_slice(&assert.get_output().stdout).unwrap();
  assert_eq!(records.len(), 2);

  env
    .stagehand_cmd()
    .args(["status", "--all"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 stage(s) succeeded"))
    .stdout(predicate::str::contains("failed at smoke"));
}
