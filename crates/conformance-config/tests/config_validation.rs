//! Cross-field validation tests for conformance-config.
// crates/conformance-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate section constraints and fail-closed combinations.
// Purpose: Ensure invalid harness configurations are rejected before a run.
// =============================================================================

use std::path::PathBuf;

use conformance_config::CatalogSource;
use conformance_config::EventSinkType;
use conformance_config::StoreType;
use conformance_core::OperationFamily;
use conformance_core::StoreOperation;

mod common;

type TestResult = Result<(), String>;

#[test]
fn memory_store_rejects_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.path = Some(PathBuf::from("tut.db"));
    common::assert_invalid(config.validate(), "memory store must not set path")
}

#[test]
fn sqlite_store_requires_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.store_type = StoreType::Sqlite;
    common::assert_invalid(config.validate(), "sqlite store requires path")
}

#[test]
fn sqlite_store_rejects_memory_only_switches() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.store_type = StoreType::Sqlite;
    config.store.path = Some(PathBuf::from("tut.db"));
    config.store.unsupported = vec![StoreOperation::ReIdentify];
    common::assert_invalid(config.validate(), "memory store only")
}

#[test]
fn memory_store_accepts_unsupported_operations() -> TestResult {
    let config = common::config_from_toml("[store]\ntype = \"memory\"\nunsupported = [\"re-identify\", \"purge\"]\n")
        .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.store.unsupported != vec![StoreOperation::ReIdentify, StoreOperation::Purge] {
        return Err(format!("unexpected unsupported list: {:?}", config.store.unsupported));
    }
    Ok(())
}

#[test]
fn run_rejects_zero_instances_and_workers() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.run.instances_per_type = 0;
    common::assert_invalid(config.validate(), "run.instances_per_type")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.run.workers = 0;
    common::assert_invalid(config.validate(), "run.workers")
}

#[test]
fn run_rejects_zero_timeout() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.run.timeout_ms = Some(0);
    common::assert_invalid(config.validate(), "run.timeout_ms")
}

#[test]
fn run_rejects_empty_and_duplicate_families() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.run.families = Vec::new();
    common::assert_invalid(config.validate(), "run.families must be non-empty")?;

    config.run.families = vec![OperationFamily::Create, OperationFamily::Create];
    common::assert_invalid(config.validate(), "more than once")
}

#[test]
fn unknown_family_fails_to_parse() -> TestResult {
    match common::config_from_toml("[run]\nfamilies = [\"teleport\"]\n") {
        Err(_) => Ok(()),
        Ok(_) => Err("unknown family should not parse".to_string()),
    }
}

#[test]
fn tut_rejects_blank_collection() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.tut.collection_id = "  ".to_string();
    common::assert_invalid(config.validate(), "tut.collection_id must be non-empty")
}

#[test]
fn catalog_source_and_path_must_agree() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.catalog.path = Some(PathBuf::from("types.toml"));
    common::assert_invalid(config.validate(), "builtin catalog must not set path")?;

    config.catalog.source = CatalogSource::File;
    config.catalog.path = None;
    common::assert_invalid(config.validate(), "file catalog requires path")
}

#[test]
fn event_sink_path_rules() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.events.sink = EventSinkType::File;
    common::assert_invalid(config.validate(), "file event sink requires path")?;

    config.events.sink = EventSinkType::None;
    config.events.path = Some(PathBuf::from("events.jsonl"));
    common::assert_invalid(config.validate(), "only the file event sink accepts path")
}

#[test]
fn overlong_report_path_component_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.report.path = Some(PathBuf::from("a".repeat(300)));
    common::assert_invalid(config.validate(), "report.path path component too long")
}
