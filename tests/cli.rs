use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Run the binary isolated from any user configuration or environment overrides
fn transcript(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("transcript").unwrap();
    cmd.current_dir(home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("TRANSCRIPT_CACHE_TTL")
        .env_remove("TRANSCRIPT_MAX_RETRIES")
        .env_remove("TRANSCRIPT_RETRY_BASE_DELAY")
        .env_remove("TRANSCRIPT_ASR_ENABLED")
        .env_remove("TRANSCRIPT_ASR_MODEL")
        .env_remove("TRANSCRIPT_COOKIES_FILE")
        .env_remove("TRANSCRIPT_COOKIES_B64")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    transcript(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn empty_video_id_is_missing_parameter() {
    let home = TempDir::new().unwrap();
    let assert = transcript(&home)
        .args(["fetch", "", "--format", "json"])
        .assert()
        .failure();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["code"], "missing_parameter");
    assert_eq!(body["status"], 400);
    assert_eq!(body["error"], "Missing video_id");
}

#[test]
fn unrecognised_url_is_rejected_in_text_mode() {
    let home = TempDir::new().unwrap();
    transcript(&home)
        .args(["fetch", "https://example.com/video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_parameter"));
}

#[test]
fn config_show_prints_defaults() {
    let home = TempDir::new().unwrap();
    transcript(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache TTL: 3600s"))
        .stdout(predicate::str::contains("Max Retry Attempts: 3"))
        .stdout(predicate::str::contains("ASR API Key: not set"));
}

#[test]
fn config_show_applies_env_overrides() {
    let home = TempDir::new().unwrap();
    transcript(&home)
        .args(["config", "--show"])
        .env("TRANSCRIPT_CACHE_TTL", "90")
        .env("TRANSCRIPT_ASR_ENABLED", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache TTL: 90s"))
        .stdout(predicate::str::contains("ASR Fallback: disabled"));
}

#[test]
fn invalid_env_override_fails() {
    let home = TempDir::new().unwrap();
    transcript(&home)
        .args(["config", "--show"])
        .env("TRANSCRIPT_MAX_RETRIES", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}

#[test]
fn local_config_file_is_read() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "retry:\n  max_attempts: 7\n").unwrap();

    transcript(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max Retry Attempts: 7"));
}
