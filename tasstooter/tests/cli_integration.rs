//! CLI integration tests for tasstooter
//!
//! Only the commands that never reach the network are exercised here.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Create a config pointing at a fresh database, without a [mastodon] section
fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("data").join("archive.db");

    let config_content = format!(
        r#"
[database]
path = "{}"
"#,
        escape_path_for_toml(&db_path.to_string_lossy())
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

fn tasstooter(config_path: &str) -> Command {
    let mut cmd = Command::cargo_bin("tasstooter").unwrap();
    cmd.env("TASSTOOTER_CONFIG", config_path)
        .env("TASSTOOTER_LOG_LEVEL", "error");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("tasstooter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Organize toots"))
        .stdout(predicate::str::contains("insert"));
}

#[test]
fn test_add_then_status() {
    let (_temp_dir, config_path) = setup_test_env();

    tasstooter(&config_path)
        .args(["add", "hello world", "http://x"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Added toot "));

    tasstooter(&config_path)
        .args(["add", "no source", "0"])
        .assert()
        .success();

    tasstooter(&config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 2"))
        .stdout(predicate::str::contains("eligible: 2"))
        .stdout(predicate::str::contains("last source: -"));
}

#[test]
fn test_add_empty_toot_is_invalid_input() {
    let (_temp_dir, config_path) = setup_test_env();

    tasstooter(&config_path)
        .args(["add", "   "])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Toot text cannot be empty"));
}

#[test]
fn test_insert_file() {
    let (temp_dir, config_path) = setup_test_env();
    let toots_path = temp_dir.path().join("toots.txt");
    fs::write(&toots_path, "first toot\nsecond toot\n\nthird toot\n").unwrap();

    tasstooter(&config_path)
        .arg("insert")
        .arg(&toots_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted 3 toots into the archive"));

    tasstooter(&config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("total: 3"));
}

#[test]
fn test_insert_missing_file() {
    let (temp_dir, config_path) = setup_test_env();

    tasstooter(&config_path)
        .arg("insert")
        .arg(temp_dir.path().join("missing.txt"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("typo.toml");

    tasstooter(&missing.to_string_lossy())
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_toot_without_mastodon_config() {
    let (_temp_dir, config_path) = setup_test_env();

    tasstooter(&config_path)
        .arg("toot")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required field: mastodon"));
}
