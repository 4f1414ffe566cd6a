// crates/conformance-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Instance Store
// Description: Durable InstanceStore backend using SQLite WAL.
// Purpose: Provide a persistent technology under test for the workbench.
// Dependencies: conformance-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`conformance_core::InstanceStore`]
//! that keeps entities and relationships in one table. Relationship ends are
//! foreign keys with cascading updates and deletes, so re-identification and
//! purge keep the graph resolvable without extra bookkeeping.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteInstanceStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
