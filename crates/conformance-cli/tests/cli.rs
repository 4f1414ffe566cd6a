// crates/conformance-cli/tests/cli.rs
// ============================================================================
// Module: CLI Binary Tests
// Description: Invokes the conformance binary end to end.
// Purpose: Validate exit codes, listings, and report output.
// Dependencies: conformance-cli, tempfile
// ============================================================================
//! ## Overview
//! Spawns the built `conformance` binary with temporary configs and checks
//! its output and exit status.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

fn conformance_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_conformance"))
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(conformance_bin())
        .args(args)
        .env_remove("CONFORMANCE_CONFIG")
        .output()
        .expect("run conformance")
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("conformance.toml");
    fs::write(&path, body).unwrap();
    path
}

const QUIET_MEMORY: &str = r#"
[run]
instances_per_type = 1
families = ["create"]

[events]
sink = "none"
"#;

#[test]
fn config_validate_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_MEMORY);
    let output = run_cli(&["config", "validate", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");
}

#[test]
fn config_validate_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[run]\ninstances_per_type = 0\n");
    let output = run_cli(&["config", "validate", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("instances_per_type"));
}

#[test]
fn profiles_lists_every_profile() {
    let output = run_cli(&["profiles"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 14);
}

#[test]
fn catalog_show_emits_builtin_json() {
    let output = run_cli(&["catalog", "show", "--format", "json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!value["types"].as_array().unwrap().is_empty());
}

#[test]
fn run_writes_report_and_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_MEMORY);
    let report = dir.path().join("out").join("report.json");
    let output = run_cli(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("fail 0"));

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(value["totals"]["fail"], 0);
    assert!(value["generated_at"].is_string());
}

#[test]
fn run_prints_report_to_stdout_without_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_MEMORY);
    let output =
        run_cli(&["run", "--config", config.to_str().unwrap(), "--compact", "--family", "create"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["interrupted"], false);
}

#[test]
fn run_timeout_is_nonconformant() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_MEMORY);
    let output = run_cli(&["run", "--config", config.to_str().unwrap(), "--timeout-ms", "1", "--instances", "200"]);
    let code = output.status.code();
    assert!(code == Some(0) || code == Some(2));
    if code == Some(2) {
        assert!(String::from_utf8_lossy(&output.stderr).contains("stopped early"));
    }
}

#[test]
fn run_rejects_zero_worker_override() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_MEMORY);
    let output = run_cli(&["run", "--config", config.to_str().unwrap(), "--workers", "0"]);
    assert_eq!(output.status.code(), Some(1));
}
