use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn bsc_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("bsc");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("messages.jsonl"),
        concat!(
            r#"{"id":"1194800000000000000","author":{"id":"1","username":"ada"},"content":"morning standup","timestamp":"2024-01-10T14:00:00+00:00"}"#,
            "\n",
            r#"{"id":"1194900000000000000","author":{"id":"2","username":"bob"},"content":"shipped the fix","timestamp":"2024-01-10T20:30:00+00:00"}"#,
            "\n",
            r#"{"id":"1195100000000000000","author":{"id":"1","username":"ada"},"content":"next day","createdTimestamp":1704974400000}"#,
            "\n",
            "this line is garbage\n",
        ),
    )
    .unwrap();

    let config_content = format!(
        r#"[index]
root = "{}/data/index"

[remote]
base_url = "http://127.0.0.1:9"
token_env = "BSC_TEST_TOKEN_UNSET"
timeout_secs = 1

[retrieval]
max_records = 100
"#,
        root.display()
    );

    let config_path = config_dir.join("bsc.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_bsc(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = bsc_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run bsc binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn messages_file(config_path: &Path) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("files/messages.jsonl")
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_window_single_date() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_bsc(&config_path, &["window", "recap {01/10/2024} please"]);
    assert!(success, "window failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("start: 2024-01-10T05:00:00.000Z"));
    assert!(stdout.contains("end:   2024-01-11T04:59:59.999Z"));
}

#[test]
fn test_window_today_with_fixed_now() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_bsc(
        &config_path,
        &["window", "{Today}", "--now", "2024-06-01T13:00:00Z"],
    );
    assert!(success, "window failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("start: 2024-06-01T04:00:00.000Z"));
    assert!(stdout.contains("end:   2024-06-01T13:00:00.000Z"));
}

#[test]
fn test_window_without_token_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_bsc(&config_path, &["window", "no dates here"]);
    assert!(!success);
    assert!(stderr.contains("no time window"));
}

#[test]
fn test_ingest_then_query() {
    let (_tmp, config_path) = setup_test_env();
    let file = messages_file(&config_path);

    let (stdout, stderr, success) = run_bsc(&config_path, &["ingest", "general", "--file", &file]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Ingested 3 records into general"));
    assert!(stdout.contains("skipped: 1"));

    let (stdout, stderr, success) = run_bsc(&config_path, &["query", "general", "{2024-01-10}"]);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout={}", stdout);
    assert!(lines[0].contains("ada: morning standup"));
    assert!(lines[1].contains("bob: shipped the fix"));
    assert!(stderr.contains("2 records"));
}

#[test]
fn test_ingest_twice_query_dedups() {
    let (_tmp, config_path) = setup_test_env();
    let file = messages_file(&config_path);

    run_bsc(&config_path, &["ingest", "general", "--file", &file]);
    run_bsc(&config_path, &["ingest", "general", "--file", &file]);

    let (stdout, _, success) = run_bsc(&config_path, &["query", "general", "{01/10/2024 - 01/11/2024}"]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn test_stats_after_ingest() {
    let (_tmp, config_path) = setup_test_env();
    let file = messages_file(&config_path);

    run_bsc(&config_path, &["ingest", "general", "--file", &file]);
    let (stdout, stderr, success) = run_bsc(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Channels:    1"));
    assert!(stdout.contains("Records:     3"));
    assert!(stdout.contains("2024-01"));
}

#[test]
fn test_fetch_requires_token() {
    let (_tmp, config_path) = setup_test_env();
    let file = messages_file(&config_path);

    run_bsc(&config_path, &["ingest", "general", "--file", &file]);
    // Token env var is unset.
    let (_, stderr, success) = run_bsc(&config_path, &["fetch", "general", "{01/10/2024}"]);
    assert!(!success);
    assert!(stderr.contains("BSC_TEST_TOKEN_UNSET not set"));
}

#[test]
fn test_invalid_channel_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_bsc(&config_path, &["query", "../etc", "{01/10/2024}"]);
    assert!(!success);
    assert!(stderr.contains("invalid channel id"));
}

#[test]
fn test_bad_config_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[retrieval]\nbatch_size = 0\n").unwrap();

    let (_, stderr, success) = run_bsc(&bad, &["query", "general", "{01/10/2024}"]);
    assert!(!success);
    assert!(stderr.contains("batch_size"));
}
