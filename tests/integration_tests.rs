//! Integration tests for the unsubscriber binary.
//!
//! These run the compiled binary without any real mail server. Configuration
//! comes from a scrubbed environment and a temporary working directory so
//! that a developer's own `.env` never leaks in.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str;

use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "EMAIL",
    "PASSWORD",
    "IMAP_HOST",
    "IMAP_PORT",
    "IMAP_MAILBOX",
    "UNSUBSCRIBER_TIMEOUT_SECS",
    "UNSUBSCRIBER_DELAY_MS",
    "UNSUBSCRIBER_OUTPUT_DIR",
    "UNSUBSCRIBER_NO_VISIT",
    "UNSUBSCRIBER_FORMAT",
    "UNSUBSCRIBER_VERBOSE",
    "RUST_LOG",
];

/// Helper to get the path to the compiled binary
fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_unsubscriber"))
}

/// Command with a clean environment, running inside `dir`
fn command_in(dir: &Path) -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.current_dir(dir);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("Failed to execute binary")
}

/// A localhost port with nothing listening on it
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_missing_email_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let output = run(command_in(dir.path()).env("PASSWORD", "app-pass"));

    assert_eq!(output.status.code(), Some(1));
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("EMAIL is not set"), "stderr: {stderr}");
    assert!(stderr.contains("https://myaccount.google.com/apppasswords"));
}

#[test]
fn test_missing_password_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let output = run(command_in(dir.path()).arg("--email").arg("me@example.com"));

    assert_eq!(output.status.code(), Some(1));
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("PASSWORD is not set"), "stderr: {stderr}");
}

#[test]
fn test_dotenv_file_is_read() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "EMAIL=fromfile@example.com\n").unwrap();

    let output = run(&mut command_in(dir.path()));

    // EMAIL came from the file, so PASSWORD is what is missing
    assert_eq!(output.status.code(), Some(1));
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("PASSWORD is not set"), "stderr: {stderr}");
}

#[test]
fn test_silent_mode_suppresses_diagnostics() {
    let dir = TempDir::new().unwrap();
    let output = run(command_in(dir.path()).arg("--verbose=0"));

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_empty());
}

#[test]
fn test_unreachable_mailbox_exits_zero_with_diagnostic() {
    let dir = TempDir::new().unwrap();
    let port = closed_port();
    let output = run(command_in(dir.path())
        .env("EMAIL", "me@example.com")
        .env("PASSWORD", "app-pass")
        .arg("--imap-host")
        .arg("127.0.0.1")
        .arg("--imap-port")
        .arg(port.to_string())
        .arg("--format")
        .arg("json"));

    assert_eq!(output.status.code(), Some(0));

    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("Error:"), "stderr: {stderr}");

    let stdout = str::from_utf8(&output.stdout).unwrap();
    let json: serde_json::Value = serde_json::from_str(stdout).unwrap();
    assert_eq!(json["outcome"]["status"], "mailbox_unavailable");
    assert_eq!(json["outcome"]["category"], "transport");
    assert_eq!(json["metadata"]["mailbox"], format!("127.0.0.1:{port}/INBOX"));

    // nothing was found, nothing was saved
    assert!(!dir.path().join("unsubscribe_links.txt").exists());
    assert!(!dir.path().join("unsubscribe_services.csv").exists());
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    let output = run(command_in(dir.path()).arg("--help"));

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("--no-visit"));
    assert!(stdout.contains("--imap-host"));
    assert!(stdout.contains("--format"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = run(command_in(dir.path()).arg("--version"));

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    assert!(stdout.contains("unsubscriber"));
}

#[test]
fn test_invalid_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = run(command_in(dir.path()).arg("--format").arg("xml"));

    assert!(!output.status.success());
}
