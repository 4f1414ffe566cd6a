// crates/conformance-cli/src/session.rs
// ============================================================================
// Module: Conformance Session
// Description: Wires a harness config into a store, context, and report.
// Purpose: Keep run orchestration testable apart from process concerns.
// Dependencies: conformance-core, conformance-config, conformance-store-sqlite, time
// ============================================================================

//! ## Overview
//! A session opens the configured technology under test, attaches the event
//! sink, runs the harness under a caller-supplied cancellation token, and
//! stamps the report with an RFC 3339 generation time. Report rendering and
//! writing live here too so the binary only decides where output goes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::sync::Arc;

use conformance_config::ConfigError;
use conformance_config::EventSinkType;
use conformance_config::EventsConfig;
use conformance_config::HarnessConfig;
use conformance_config::StoreType;
use conformance_core::InstanceStore;
use conformance_core::MetadataCollectionId;
use conformance_core::runtime::CancellationToken;
use conformance_core::runtime::ConformanceReport;
use conformance_core::runtime::FileEventSink;
use conformance_core::runtime::HarnessEventSink;
use conformance_core::runtime::HarnessRunner;
use conformance_core::runtime::InMemoryInstanceStore;
use conformance_core::runtime::NoopEventSink;
use conformance_core::runtime::RunOutcome;
use conformance_core::runtime::RunnerError;
use conformance_core::runtime::StderrEventSink;
use conformance_core::runtime::WorkContext;
use conformance_store_sqlite::SqliteInstanceStore;
use conformance_store_sqlite::SqliteStoreError;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while preparing, running, or writing a conformance session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration or catalog loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The technology under test could not be opened.
    #[error("store error: {0}")]
    Store(#[from] SqliteStoreError),
    /// The event sink could not be opened.
    #[error("event sink error: {0}")]
    Events(String),
    /// The runner could not produce a report.
    #[error(transparent)]
    Runner(#[from] RunnerError),
    /// The report could not be rendered or written.
    #[error("report output error: {0}")]
    Output(String),
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Opens the configured technology under test.
///
/// # Errors
///
/// Returns [`SessionError`] when the sqlite store cannot be opened or the
/// store section is inconsistent.
pub fn open_store(config: &HarnessConfig) -> Result<Arc<dyn InstanceStore>, SessionError> {
    let collection_id = MetadataCollectionId::new(config.tut.collection_id.clone());
    match config.store.store_type {
        StoreType::Memory => {
            let mut store = InMemoryInstanceStore::new(collection_id)
                .with_unsupported(config.store.unsupported.iter().copied());
            if let Some(concurrent) = config.store.concurrent_mutation {
                store = store.with_concurrent_mutation(concurrent);
            }
            Ok(Arc::new(store))
        }
        StoreType::Sqlite => {
            let sqlite = config.store.sqlite_config().ok_or_else(|| {
                SessionError::Config(ConfigError::Invalid("sqlite store requires path".to_string()))
            })?;
            Ok(Arc::new(SqliteInstanceStore::new(sqlite, collection_id)?))
        }
    }
}

/// Opens the configured lifecycle event sink.
///
/// # Errors
///
/// Returns [`SessionError::Events`] when the event file cannot be opened.
pub fn open_event_sink(config: &EventsConfig) -> Result<Arc<dyn HarnessEventSink>, SessionError> {
    match (config.sink, &config.path) {
        (EventSinkType::Stderr, _) => Ok(Arc::new(StderrEventSink)),
        (EventSinkType::None, _) => Ok(Arc::new(NoopEventSink)),
        (EventSinkType::File, Some(path)) => {
            let sink = FileEventSink::new(path)
                .map_err(|err| SessionError::Events(format!("{}: {err}", path.display())))?;
            Ok(Arc::new(sink))
        }
        (EventSinkType::File, None) => {
            Err(SessionError::Events("file event sink requires path".to_string()))
        }
    }
}

/// Builds the shared work context for a run.
///
/// # Errors
///
/// Returns [`SessionError`] when the store or event sink cannot be opened.
pub fn build_context(config: &HarnessConfig) -> Result<WorkContext, SessionError> {
    let store = open_store(config)?;
    let events = open_event_sink(&config.events)?;
    Ok(WorkContext::new(
        store,
        config.tut.identity(),
        config.tut.user(),
        config.run.instances_per_type,
    )
    .with_events(events))
}

/// Runs the harness once for the given configuration.
///
/// The returned report carries a generation timestamp; the outcome digest
/// is unaffected by it.
///
/// # Errors
///
/// Returns [`SessionError`] when wiring fails or no report can be built.
pub fn run_session(
    config: &HarnessConfig,
    token: &CancellationToken,
) -> Result<RunOutcome, SessionError> {
    let catalog = config.type_catalog()?;
    let ctx = build_context(config)?;
    let runner = HarnessRunner::new(config.run.run_options());
    let mut outcome = runner.run(&ctx, &catalog, token)?;
    outcome.report.generated_at = timestamp_rfc3339(OffsetDateTime::now_utc());
    Ok(outcome)
}

/// Formats a timestamp as RFC 3339, or `None` when it cannot be represented.
#[must_use]
pub fn timestamp_rfc3339(at: OffsetDateTime) -> Option<String> {
    at.format(&Rfc3339).ok()
}

// ============================================================================
// SECTION: Report Output
// ============================================================================

/// Renders a report as JSON.
///
/// # Errors
///
/// Returns [`SessionError::Output`] when serialization fails.
pub fn render_report(report: &ConformanceReport, pretty: bool) -> Result<String, SessionError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    rendered.map_err(|err| SessionError::Output(err.to_string()))
}

/// Writes a rendered report to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`SessionError::Output`] when the file cannot be written.
pub fn write_report(path: &Path, rendered: &str) -> Result<(), SessionError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|err| SessionError::Output(format!("{}: {err}", parent.display())))?;
    }
    fs::write(path, format!("{rendered}\n"))
        .map_err(|err| SessionError::Output(format!("{}: {err}", path.display())))
}
