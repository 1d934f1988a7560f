//! Tests for file logging

use std::fs;

use runboard_monitor::logging;
use tempfile::TempDir;

#[test]
fn test_init_creates_directory_and_writes_without_ansi() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("nested").join("runboard.log");

    logging::init(&log_path, "info").expect("Failed to init logging");
    tracing::info!(run_id = "run-42", "poll finished");

    assert!(log_path.exists(), "Log file should be created");
    let content = fs::read_to_string(&log_path).expect("Failed to read log file");
    assert!(content.contains("runboard starting"), "Startup line should be logged");
    assert!(content.contains("run_id=\"run-42\""), "Fields should be structured");
    assert!(!content.contains('\u{1b}'), "Log file should not contain ANSI escapes");
}

#[test]
fn test_init_fails_when_directory_cannot_be_created() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, "file").expect("Failed to write blocker");

    let result = logging::init(&blocker.join("runboard.log"), "info");

    let err = result.expect_err("a file in the way should fail");
    assert!(format!("{:#}", err).contains("failed to create log directory"));
}

#[test]
fn test_invalid_configured_filter_falls_back() {
    if std::env::var_os(logging::LOG_ENV).is_some() {
        return;
    }
    let filter = logging::build_filter("runboard=verbose");
    assert_eq!(filter.to_string(), "info");

    let filter = logging::build_filter("runboard_data=debug");
    assert_eq!(filter.to_string(), "runboard_data=debug");
}
