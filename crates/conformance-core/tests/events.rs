// crates/conformance-core/tests/events.rs
// ============================================================================
// Module: Harness Event Sink Tests
// Description: JSON-line output of harness lifecycle events.
// Purpose: Ensure file sinks append one parseable JSON object per event.
// Dependencies: conformance-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Writes events through the file sink and parses them back as JSON lines.

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

use conformance_core::TestCaseId;
use conformance_core::runtime::FileEventSink;
use conformance_core::runtime::HarnessEvent;
use conformance_core::runtime::HarnessEventKind;
use conformance_core::runtime::HarnessEventSink;
use serde_json::Value;

#[test]
fn file_sink_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let sink = FileEventSink::new(&path).unwrap();
    sink.record(&HarnessEvent::now(HarnessEventKind::UnitStarted {
        test_case_id: TestCaseId::new("repository-entity-create-performance-A"),
    }));
    sink.record(&HarnessEvent::now(HarnessEventKind::RunFinished {
        assertions: 4,
        interrupted: false,
    }));
    drop(sink);

    let reopened = FileEventSink::new(&path).unwrap();
    reopened.record(&HarnessEvent::now(HarnessEventKind::UnitSkipped {
        test_case_id: TestCaseId::new("repository-entity-purge-performance-A"),
        reason: "run cancelled before unit started".to_string(),
    }));

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["event"], "unit_started");
    assert_eq!(lines[0]["test_case_id"], "repository-entity-create-performance-A");
    assert_eq!(lines[1]["event"], "run_finished");
    assert_eq!(lines[1]["assertions"], 4);
    assert_eq!(lines[2]["event"], "unit_skipped");
    assert!(lines.iter().all(|line| line["timestamp_ms"].is_u64()));
}
