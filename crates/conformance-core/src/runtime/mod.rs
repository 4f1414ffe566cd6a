// crates/conformance-core/src/runtime/mod.rs
// ============================================================================
// Module: Conformance Runtime
// Description: Test case engine, runner, aggregation, and reference stores.
// Purpose: Execute conformance workloads against a store under test.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules plan one unit per (operation family, type), execute the
//! units on a bounded worker pool, and aggregate every contract call into
//! profile-bucketed evidence. The in-memory store is a complete reference
//! implementation of the store contract.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod aggregator;
pub mod catalog;
pub mod context;
pub mod engine;
pub mod events;
pub mod runner;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregator::ConformanceReport;
pub use aggregator::ProfileSummary;
pub use aggregator::ReportError;
pub use aggregator::ReportMetadata;
pub use aggregator::ReportTotals;
pub use aggregator::ResultAggregator;
pub use aggregator::UnitRecord;
pub use aggregator::UnitStatus;
pub use aggregator::percentile;
pub use catalog::StaticTypeCatalog;
pub use catalog::builtin_type_catalog;
pub use context::IdentityGenerator;
pub use context::RandomIdentityGenerator;
pub use context::ScriptedIdentityGenerator;
pub use context::SequentialIdentityGenerator;
pub use context::TutIdentity;
pub use context::WorkContext;
pub use engine::Phase;
pub use engine::TestUnit;
pub use engine::UnitError;
pub use engine::UnitOutcome;
pub use engine::UnitPhase;
pub use engine::UnitPlan;
pub use engine::plan_units;
pub use engine::test_case_id;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::HarnessEventKind;
pub use events::HarnessEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use runner::CancellationToken;
pub use runner::DEFAULT_WORKERS;
pub use runner::HarnessRunner;
pub use runner::RunOptions;
pub use runner::RunOutcome;
pub use runner::RunnerError;
pub use runner::SerializePolicy;
pub use runner::StopReason;
pub use store::InMemoryInstanceStore;
