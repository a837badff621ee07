//! CLI smoke tests that do not require the codec engine or network.

use assert_cmd::Command;
use predicates::prelude::*;

fn dictum() -> Command {
    Command::cargo_bin("dictum").expect("binary builds")
}

#[test]
fn version_prints_package_version() {
    dictum()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn validate_default_config_warns_about_api_key() {
    dictum()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("api.api_key"));
}

#[test]
fn validate_accepts_explicit_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dictum.json");
    std::fs::write(&path, r#"{"api": {"api_key": "k"}}"#).unwrap();

    dictum()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"));
}

#[test]
fn unsupported_format_is_rejected_before_any_work() {
    dictum()
        .args(["compress", "does-not-exist.wav", "--format", "flac"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format: flac"));
}

#[test]
fn check_tools_reports_engine_status() {
    dictum()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"));
}

#[test]
fn concat_requires_inputs() {
    dictum().arg("concat").assert().failure();
}
