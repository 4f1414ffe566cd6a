// crates/conformance-config/src/config.rs
// ============================================================================
// Module: Conformance Configuration
// Description: Configuration loading and validation for harness runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: conformance-core, conformance-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file describes a run against the
//! in-memory reference store with the built-in type catalog. Invalid
//! combinations (for example a sqlite store without a path) fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use conformance_core::MetadataCollectionId;
use conformance_core::OperationFamily;
use conformance_core::StoreOperation;
use conformance_core::UserId;
use conformance_core::runtime::DEFAULT_WORKERS;
use conformance_core::runtime::RunOptions;
use conformance_core::runtime::SerializePolicy;
use conformance_core::runtime::StaticTypeCatalog;
use conformance_core::runtime::TutIdentity;
use conformance_core::runtime::builtin_type_catalog;
use conformance_store_sqlite::SqliteStoreConfig;
use conformance_store_sqlite::SqliteStoreMode;
use conformance_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::load_type_catalog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "conformance.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "CONFORMANCE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of names and identifiers in the `[tut]` section.
pub(crate) const MAX_NAME_LENGTH: usize = 256;
/// Default number of instances exercised per type.
pub(crate) const DEFAULT_INSTANCES_PER_TYPE: usize = 10;
/// Maximum number of instances exercised per type.
pub(crate) const MAX_INSTANCES_PER_TYPE: usize = 10_000;
/// Maximum worker pool size.
pub(crate) const MAX_WORKERS: usize = 256;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Harness run configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Technology-under-test identity.
    #[serde(default)]
    pub tut: TutConfig,
    /// Run shape: instance count, workers, families, timeout.
    #[serde(default)]
    pub run: RunConfig,
    /// Store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Type catalog source.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Report output configuration.
    #[serde(default)]
    pub report: ReportConfig,
    /// Lifecycle event sink configuration.
    #[serde(default)]
    pub events: EventsConfig,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `CONFORMANCE_CONFIG`, then
    /// `conformance.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tut.validate()?;
        self.run.validate()?;
        self.store.validate()?;
        self.catalog.validate()?;
        self.report.validate()?;
        self.events.validate()?;
        Ok(())
    }

    /// Loads the configured type catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the catalog file is unreadable or invalid.
    pub fn type_catalog(&self) -> Result<StaticTypeCatalog, ConfigError> {
        match (self.catalog.source, &self.catalog.path) {
            (CatalogSource::File, Some(path)) => load_type_catalog(path),
            (CatalogSource::File, None) => {
                Err(ConfigError::Invalid("file catalog requires path".to_string()))
            }
            (CatalogSource::Builtin, _) => builtin_type_catalog()
                .map_err(|err| ConfigError::Invalid(format!("builtin catalog: {err}"))),
        }
    }
}

// ============================================================================
// SECTION: Technology Under Test
// ============================================================================

/// Identity of the technology under test.
#[derive(Debug, Clone, Deserialize)]
pub struct TutConfig {
    /// Display name of the server under test.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    /// Collection whose instances the harness may mutate.
    #[serde(default = "default_collection_id")]
    pub collection_id: String,
    /// User identity passed on every contract call.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for TutConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            collection_id: default_collection_id(),
            user_id: default_user_id(),
        }
    }
}

impl TutConfig {
    /// Returns the TUT identity used by the work context.
    #[must_use]
    pub fn identity(&self) -> TutIdentity {
        TutIdentity {
            server_name: self.server_name.clone(),
            collection_id: MetadataCollectionId::new(self.collection_id.clone()),
        }
    }

    /// Returns the calling user identity.
    #[must_use]
    pub fn user(&self) -> UserId {
        UserId::new(self.user_id.clone())
    }

    /// Validates TUT identity fields.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("tut.server_name", &self.server_name)?;
        validate_name("tut.collection_id", &self.collection_id)?;
        validate_name("tut.user_id", &self.user_id)
    }
}

/// Returns the default server name.
fn default_server_name() -> String {
    "reference-memory-store".to_string()
}

/// Returns the default collection identifier.
fn default_collection_id() -> String {
    "conformance-collection".to_string()
}

/// Returns the default user identity.
fn default_user_id() -> String {
    "conformance-user".to_string()
}

// ============================================================================
// SECTION: Run Shape
// ============================================================================

/// Run shape configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Maximum instances exercised per type (N).
    #[serde(default = "default_instances_per_type")]
    pub instances_per_type: usize,
    /// Worker pool size.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Overall run timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Operation families to execute.
    #[serde(default = "default_families")]
    pub families: Vec<OperationFamily>,
    /// Serialization policy for mutating phases.
    #[serde(default)]
    pub serialize_mutations: SerializePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            instances_per_type: default_instances_per_type(),
            workers: default_workers(),
            timeout_ms: None,
            families: default_families(),
            serialize_mutations: SerializePolicy::default(),
        }
    }
}

impl RunConfig {
    /// Returns runner options for this configuration.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            workers: self.workers,
            timeout: self.timeout_ms.map(Duration::from_millis),
            families: self.families.clone(),
            serialize: self.serialize_mutations,
        }
    }

    /// Validates run shape limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.instances_per_type == 0 || self.instances_per_type > MAX_INSTANCES_PER_TYPE {
            return Err(ConfigError::Invalid(format!(
                "run.instances_per_type must be between 1 and {MAX_INSTANCES_PER_TYPE}"
            )));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::Invalid(format!(
                "run.workers must be between 1 and {MAX_WORKERS}"
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "run.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.families.is_empty() {
            return Err(ConfigError::Invalid("run.families must be non-empty".to_string()));
        }
        for (index, family) in self.families.iter().enumerate() {
            if self.families[..index].contains(family) {
                return Err(ConfigError::Invalid(format!(
                    "run.families lists {family} more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Returns the default instance count per type.
const fn default_instances_per_type() -> usize {
    DEFAULT_INSTANCES_PER_TYPE
}

/// Returns the default worker count.
const fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Returns every operation family.
fn default_families() -> Vec<OperationFamily> {
    OperationFamily::ALL.to_vec()
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory reference store.
    #[default]
    Memory,
    /// `SQLite`-backed store.
    Sqlite,
}

/// Store backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Operations the memory store reports as unsupported.
    #[serde(default)]
    pub unsupported: Vec<StoreOperation>,
    /// Overrides the memory store's concurrent mutation declaration.
    #[serde(default)]
    pub concurrent_mutation: Option<bool>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            unsupported: Vec::new(),
            concurrent_mutation: None,
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_store_path(path)?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                if !self.unsupported.is_empty() || self.concurrent_mutation.is_some() {
                    return Err(ConfigError::Invalid(
                        "store unsupported and concurrent_mutation apply to the memory store only"
                            .to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Returns the default busy timeout for sqlite stores.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Type catalog source selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Built-in sample catalog.
    #[default]
    Builtin,
    /// TOML catalog file.
    File,
}

/// Type catalog configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Catalog source.
    #[serde(default)]
    pub source: CatalogSource,
    /// Catalog file path when using the file source.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    /// Validates catalog configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.source, &self.path) {
            (CatalogSource::Builtin, Some(_)) => {
                Err(ConfigError::Invalid("builtin catalog must not set path".to_string()))
            }
            (CatalogSource::Builtin, None) => Ok(()),
            (CatalogSource::File, None) => {
                Err(ConfigError::Invalid("file catalog requires path".to_string()))
            }
            (CatalogSource::File, Some(path)) => {
                validate_path_string("catalog.path", &path.to_string_lossy())
            }
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Report output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Report file path; stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Pretty-print the JSON report.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: None,
            pretty: default_pretty(),
        }
    }
}

impl ReportConfig {
    /// Validates report configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("report.path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Returns the default pretty-print flag.
const fn default_pretty() -> bool {
    true
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkType {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events discarded.
    None,
}

/// Lifecycle event sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: EventSinkType,
    /// Event log path when using the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates event sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkType::File, None) => {
                Err(ConfigError::Invalid("file event sink requires path".to_string()))
            }
            (EventSinkType::File, Some(path)) => {
                validate_path_string("events.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("only the file event sink accepts path".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates sqlite store paths against length limits.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("store path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("store path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a non-empty, bounded name.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds {MAX_NAME_LENGTH} bytes")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
