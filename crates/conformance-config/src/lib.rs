// crates/conformance-config/src/lib.rs
// ============================================================================
// Module: Conformance Config Library
// Description: Canonical harness config model, validation, and catalog files.
// Purpose: Single source of truth for conformance.toml semantics.
// Dependencies: conformance-core, conformance-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `conformance-config` defines the configuration model for a harness run:
//! the technology under test, run shape, store backend, type catalog source,
//! report destination, and event sink. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CatalogFile;
pub use catalog::load_type_catalog;
pub use catalog::parse_type_catalog;
pub use config::*;
pub use examples::config_toml_example;
