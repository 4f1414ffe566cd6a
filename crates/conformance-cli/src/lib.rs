// crates/conformance-cli/src/lib.rs
// ============================================================================
// Module: Conformance CLI Library
// Description: Shared session wiring for the conformance command-line tool.
// Purpose: Turn a validated config into a store, work context, and report.
// Dependencies: conformance-core, conformance-config, conformance-store-sqlite
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and owns process
//! concerns (signals, exit codes, stdout). Everything between a loaded
//! [`conformance_config::HarnessConfig`] and a rendered report lives in
//! [`session`] so it can be tested without spawning the binary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use session::SessionError;
pub use session::build_context;
pub use session::open_event_sink;
pub use session::open_store;
pub use session::render_report;
pub use session::run_session;
pub use session::timestamp_rfc3339;
pub use session::write_report;
