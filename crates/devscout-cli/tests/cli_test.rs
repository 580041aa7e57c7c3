//! End-to-end tests for the `devscout` binary.
//!
//! Each test gets an isolated `XDG_CONFIG_HOME` and, where a workflow is
//! needed, a shell script speaking the line-delimited JSON protocol.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn devscout(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_devscout"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("DEVSCOUT_WORKFLOW")
        .env_remove("DEVSCOUT_PORT")
        .env("RUST_LOG", "off");
    cmd
}

fn run_console(config_home: &Path, workflow: &Path, input: &str) -> Output {
    let mut child = devscout(config_home)
        .arg("--workflow")
        .arg(workflow)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start devscout");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

const ACME_SCRIPT: &str = r#"
echo '{"type":"log","message":"Finding articles about '"$1"'"}'
echo 'plain progress line'
echo '{"type":"result","companies":[{"name":"Acme","website":"acme.io","pricing_model":"freemium","is_open_source":false,"tech_stack":["Rust","Go","Python","C++","Java","Kotlin"],"api_available":true}],"analysis":null}'
"#;

// -----------------------------------------------------------------------
// Console
// -----------------------------------------------------------------------

#[test]
fn console_prints_logs_and_report() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(tmp.path(), "research.sh", ACME_SCRIPT);

    let output = run_console(tmp.path(), &script, "vector databases\nquit\n");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Developer Tools Research Agent\n"));
    assert!(stdout.contains("Finding articles about vector databases\n"));
    assert!(stdout.contains("plain progress line\n"));
    assert!(stdout.contains("📊 Results for: vector databases\n"));
    assert!(stdout.contains("1. 🏢 Acme\n"));
    assert!(stdout.contains("   🌐 Website: acme.io\n"));
    assert!(stdout.contains("   📖 Open Source: No\n"));
    assert!(stdout.contains("Tech Stack: Rust, Go, Python, C++, Java\n"));
    assert!(stdout.contains("   🔌 API: Available\n"));
    assert!(!stdout.contains("Kotlin"));
    assert!(!stdout.contains("Description"));
    assert!(!stdout.contains("Developer Recommendations"));
}

#[test]
fn console_reports_workflow_error_and_continues() {
    let tmp = TempDir::new().unwrap();
    let failing = write_script(
        tmp.path(),
        "failing.sh",
        "echo '{\"type\":\"error\",\"message\":\"search API timed out\"}'\nexit 1\n",
    );

    let output = run_console(tmp.path(), &failing, "first\nsecond\nexit\n");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Error: search API timed out\n").count(), 2);
    assert!(!stdout.contains("📊 Results for:"));
}

#[test]
fn console_reports_missing_program() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist");

    let output = run_console(tmp.path(), &missing, "vector databases\n");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(
        stdout.contains("Error: failed to spawn workflow program"),
        "unexpected output: {stdout}"
    );
}

#[test]
fn console_workflow_comes_from_config_file() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(tmp.path(), "research.sh", ACME_SCRIPT);
    let config_dir = tmp.path().join("devscout");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!("[workflow]\nprogram = {:?}\n", script.to_str().unwrap()),
    )
    .unwrap();

    let mut child = devscout(tmp.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"vector databases\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("1. 🏢 Acme"), "unexpected output: {stdout}");
}

// -----------------------------------------------------------------------
// Init
// -----------------------------------------------------------------------

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("devscout").join("config.toml");

    let first = devscout(tmp.path()).arg("init").output().unwrap();
    assert!(first.status.success());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("program = \"devscout-workflow\""));
    assert!(written.contains("port = 8000"));
    assert!(written.contains("dark_mode = true"));

    let second = devscout(tmp.path()).arg("init").output().unwrap();
    assert!(!second.status.success());
    let stderr = String::from_utf8(second.stderr).unwrap();
    assert!(stderr.contains("already exists"), "unexpected stderr: {stderr}");

    let forced = devscout(tmp.path())
        .args(["init", "--force"])
        .output()
        .unwrap();
    assert!(forced.status.success());
}

#[test]
fn malformed_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("devscout");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[server\nport = ").unwrap();

    let output = devscout(tmp.path())
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(
        stderr.contains("failed to parse config file"),
        "unexpected stderr: {stderr}"
    );
}
