//! Command-line behaviour of the birdcast binary
//!
//! Only paths that never reach a real Mastodon instance are covered here; the
//! sync pipeline itself is tested in libbirdcast with the mock publisher.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

/// Temp dir holding a config file whose cache directory lives next to it
fn setup_test_env(accounts: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");
    let config_path = temp_dir.path().join("config.toml");

    let config_content = format!(
        r#"
user_agent = "Birdcast tests"
cache_dir = "{}"

[server]
instance = "social.invalid"
client_id = "cid"
client_secret = "csecret"
{}
"#,
        escape_path_for_toml(&cache_dir),
        accounts
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path)
}

const INACTIVE_ACCOUNT: &str = r#"
[[accounts]]
name = "news"
active = false
feed_url = "http://127.0.0.1:9/news.xml"
username = "news@example.org"
password = "pw"
"#;

fn birdcast() -> Command {
    let mut cmd = Command::cargo_bin("birdcast").unwrap();
    cmd.env_remove("BIRDCAST_CONFIG")
        .env_remove("BIRDCAST_LOG_FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_flags() {
    birdcast()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--account"))
        .stdout(predicate::str::contains("--trash"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--log-format"));
}

#[test]
fn test_missing_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    birdcast()
        .arg("-c")
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_malformed_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "user_agent = \n").unwrap();

    birdcast()
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_no_active_accounts_succeeds() {
    let (_temp_dir, config_path) = setup_test_env(INACTIVE_ACCOUNT);

    birdcast().arg("-c").arg(&config_path).assert().success();
}

#[test]
fn test_unknown_account_filter_fails() {
    let (_temp_dir, config_path) = setup_test_env(INACTIVE_ACCOUNT);

    birdcast()
        .arg("-c")
        .arg(&config_path)
        .args(["-a", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No such account: ghost"));
}

#[test]
fn test_trash_unknown_account_fails() {
    let (_temp_dir, config_path) = setup_test_env(INACTIVE_ACCOUNT);

    birdcast()
        .arg("-c")
        .arg(&config_path)
        .args(["--trash", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No such account: ghost"));
}

#[test]
fn test_trash_conflicts_with_dry_run() {
    birdcast()
        .args(["--trash", "news", "--dry-run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unreachable_feed_fails_without_state() {
    let (temp_dir, config_path) = setup_test_env(INACTIVE_ACCOUNT);

    // A single-account filter runs the account even though it is inactive
    birdcast()
        .arg("-c")
        .arg(&config_path)
        .args(["-a", "news", "--noop"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Fetching failed"));

    assert!(!temp_dir.path().join("cache").join("news.cache").exists());
}

#[test]
fn test_invalid_log_format_rejected() {
    birdcast()
        .args(["--log-format", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid log format"));
}
