// crates/conformance-core/src/lib.rs
// ============================================================================
// Module: Metadata Conformance Core Library
// Description: Public API surface for the conformance workbench core.
// Purpose: Expose the store contract, data model, and harness runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The conformance core drives a metadata instance store through creation,
//! search, re-identification, re-typing, soft delete and restore, and purge,
//! and records one classified, timed assertion per contract call. Stores plug
//! in through the [`InstanceStore`] trait; types come from a [`TypeCatalog`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CatalogError;
pub use interfaces::ContractError;
pub use interfaces::InstanceStore;
pub use interfaces::NewInstance;
pub use interfaces::SearchRequest;
pub use interfaces::TypeCatalog;
pub use runtime::CancellationToken;
pub use runtime::ConformanceReport;
pub use runtime::HarnessRunner;
pub use runtime::InMemoryInstanceStore;
pub use runtime::ResultAggregator;
pub use runtime::RunOptions;
pub use runtime::RunOutcome;
pub use runtime::StaticTypeCatalog;
pub use runtime::WorkContext;
