// crates/conformance-core/src/runtime/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured run lifecycle events and JSON-line sinks.
// Purpose: Emit machine-readable progress logs without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The runner emits one [`HarnessEvent`] per lifecycle transition (run, phase,
//! unit). Sinks serialize events as single JSON lines so they can be routed to
//! any log pipeline. Sink failures never interrupt a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::MetadataCollectionId;
use crate::core::OperationFamily;
use crate::core::TestCaseId;
use crate::core::TypeCategory;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Lifecycle transition reported by the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarnessEventKind {
    /// A run started.
    RunStarted {
        /// Server name of the technology under test.
        server_name: String,
        /// Collection the harness mutates.
        collection_id: MetadataCollectionId,
        /// Number of scheduled units.
        units: usize,
        /// Effective worker width for mutating phases.
        width: usize,
    },
    /// A phase started.
    PhaseStarted {
        /// Operation family of the phase.
        family: OperationFamily,
        /// Type category of the phase.
        category: TypeCategory,
        /// Units in the phase.
        units: usize,
    },
    /// A unit started.
    UnitStarted {
        /// Test case identifier.
        test_case_id: TestCaseId,
    },
    /// A unit completed normally.
    UnitFinished {
        /// Test case identifier.
        test_case_id: TestCaseId,
        /// Assertions recorded by the unit.
        assertions: usize,
        /// Completion summary.
        summary: String,
    },
    /// A unit aborted on an operation error.
    UnitAborted {
        /// Test case identifier.
        test_case_id: TestCaseId,
        /// Abort message.
        error: String,
    },
    /// A unit was never started.
    UnitSkipped {
        /// Test case identifier.
        test_case_id: TestCaseId,
        /// Skip reason.
        reason: String,
    },
    /// A run finished.
    RunFinished {
        /// Assertions recorded across the run.
        assertions: usize,
        /// True when the run stopped on cancellation or timeout.
        interrupted: bool,
    },
}

/// Timestamped harness event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event payload.
    #[serde(flatten)]
    pub kind: HarnessEventKind,
}

impl HarnessEvent {
    /// Stamps an event payload with the current time.
    #[must_use]
    pub fn now(kind: HarnessEventKind) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            kind,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink for harness lifecycle events.
pub trait HarnessEventSink: Send + Sync {
    /// Records a harness event.
    fn record(&self, event: &HarnessEvent);
}

/// JSON-lines sink that writes to stderr.
pub struct StderrEventSink;

impl HarnessEventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// JSON-lines sink that appends to a file.
pub struct FileEventSink {
    /// Output file guarded for concurrent writers.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens (or creates) the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessEventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
        }
    }
}

/// Sink that discards events.
pub struct NoopEventSink;

impl HarnessEventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl HarnessEventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
    }
}
