// crates/conformance-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Instance Store
// Description: Durable InstanceStore backed by SQLite WAL.
// Purpose: Persist entities and relationships with transactional mutations.
// Dependencies: conformance-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`InstanceStore`] on a single `SQLite` table. Every
//! contract call runs in its own transaction on a mutex-guarded connection,
//! which makes identity mutations atomic and lets the store declare
//! concurrent mutation safe. Relationship ends are foreign keys declared with
//! `ON UPDATE CASCADE ON DELETE CASCADE`: re-identifying an entity rewrites
//! every end that referenced it, and purging an entity removes the
//! relationships attached to it.
//!
//! Database contents are untrusted; malformed rows surface as
//! [`SqliteStoreError::Corrupt`] wrapped in a contract operation error.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use conformance_core::ContractError;
use conformance_core::Instance;
use conformance_core::InstanceGuid;
use conformance_core::InstanceProperties;
use conformance_core::InstanceRef;
use conformance_core::InstanceStatus;
use conformance_core::InstanceStore;
use conformance_core::MetadataCollectionId;
use conformance_core::NewInstance;
use conformance_core::RelationshipEnds;
use conformance_core::SearchRequest;
use conformance_core::StoreOperation;
use conformance_core::TypeCategory;
use conformance_core::TypeDescriptor;
use conformance_core::TypeId;
use conformance_core::UserId;
use conformance_core::runtime::IdentityGenerator;
use conformance_core::runtime::RandomIdentityGenerator;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// Current schema version.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list shared by every instance query, in [`InstanceRow::read`] order.
const INSTANCE_COLUMNS: &str =
    "guid, collection_id, type_id, type_name, version, status, properties_json, end_one, end_two";

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` instance store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default timeouts and modes.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl SqliteStoreError {
    /// Wraps the error as an operation failure of a contract call.
    #[must_use]
    pub fn into_contract(self, operation: StoreOperation) -> ContractError {
        ContractError::operation(operation, self.to_string())
    }
}

/// Returns a mapper from engine errors to contract operation errors.
fn db_error(operation: StoreOperation) -> impl Fn(rusqlite::Error) -> ContractError {
    move |err| SqliteStoreError::Db(err.to_string()).into_contract(operation)
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed instance store with WAL support.
///
/// # Invariants
/// - Every relationship end references a stored instance (enforced by
///   foreign keys).
/// - Each contract call is a single transaction; failed calls leave no
///   partial writes.
#[derive(Clone)]
pub struct SqliteInstanceStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Collection new instances are homed in.
    collection_id: MetadataCollectionId,
    /// Identity source for created instances.
    identities: Arc<dyn IdentityGenerator>,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteInstanceStore {
    /// Opens an `SQLite`-backed instance store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when it carries a different schema version.
    pub fn new(
        config: SqliteStoreConfig,
        collection_id: MetadataCollectionId,
    ) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            collection_id,
            identities: Arc::new(RandomIdentityGenerator),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Replaces the identity source for created instances.
    #[must_use]
    pub fn with_identities(mut self, identities: Arc<dyn IdentityGenerator>) -> Self {
        self.identities = identities;
        self
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Inserts an instance verbatim, including foreign-collection instances.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Conflict`] when the identity is already held,
    /// or [`ContractError::NotFound`] when a relationship end is missing.
    pub fn seed(&self, instance: &Instance) -> Result<(), ContractError> {
        let operation = StoreOperation::AddInstance;
        self.transact(operation, |tx| {
            if load(tx, instance.guid()).map_err(|err| err.into_contract(operation))?.is_some() {
                return Err(ContractError::conflict(
                    operation,
                    instance.guid(),
                    "identity already in use",
                ));
            }
            if let Some(ends) = &instance.ends {
                for end in [&ends.end_one, &ends.end_two] {
                    if load(tx, end).map_err(|err| err.into_contract(operation))?.is_none() {
                        return Err(ContractError::not_found(operation, end));
                    }
                }
            }
            insert(tx, instance).map_err(|err| err.into_contract(operation))
        })
    }

    /// Returns a snapshot of an instance regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationError`] when the row cannot be read.
    pub fn snapshot(&self, guid: &InstanceGuid) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::GetInstance;
        self.transact(operation, |tx| load(tx, guid).map_err(|err| err.into_contract(operation)))
    }

    /// Returns the number of stored instances (all statuses).
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationError`] when the count cannot be read.
    pub fn len(&self) -> Result<usize, ContractError> {
        let operation = StoreOperation::Search;
        self.transact(operation, |tx| {
            let count: i64 = tx
                .query_row("SELECT COUNT(*) FROM instances", params![], |row| row.get(0))
                .map_err(db_error(operation))?;
            usize::try_from(count).map_err(|_| {
                SqliteStoreError::Corrupt(format!("invalid instance count {count}"))
                    .into_contract(operation)
            })
        })
    }

    /// Returns true when no instances are stored.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationError`] when the count cannot be read.
    pub fn is_empty(&self) -> Result<bool, ContractError> {
        Ok(self.len()? == 0)
    }

    /// Runs `body` in a transaction, committing only when it succeeds.
    fn transact<T>(
        &self,
        operation: StoreOperation,
        body: impl FnOnce(&Transaction<'_>) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        let mut guard = self.connection.lock().map_err(|_| {
            SqliteStoreError::Db("mutex poisoned".to_string()).into_contract(operation)
        })?;
        let tx = guard.transaction().map_err(db_error(operation))?;
        let value = body(&tx)?;
        tx.commit().map_err(db_error(operation))?;
        Ok(value)
    }
}

impl InstanceStore for SqliteInstanceStore {
    fn metadata_collection_id(&self) -> MetadataCollectionId {
        self.collection_id.clone()
    }

    fn supports_concurrent_mutation(&self) -> bool {
        true
    }

    fn search(
        &self,
        _user: &UserId,
        request: &SearchRequest,
    ) -> Result<Vec<Instance>, ContractError> {
        let operation = StoreOperation::Search;
        let page_size = if request.page_size == 0 { request.limit } else { request.page_size };
        let take = page_size.min(request.limit);
        self.transact(operation, |tx| {
            let mut statement = tx
                .prepare(&format!(
                    "SELECT {INSTANCE_COLUMNS} FROM instances WHERE type_id = ?1 AND status = ?2 \
                     ORDER BY guid"
                ))
                .map_err(db_error(operation))?;
            let rows = statement
                .query_map(
                    params![request.type_id.as_str(), InstanceStatus::Active.as_str()],
                    InstanceRow::read,
                )
                .map_err(db_error(operation))?;
            let mut found = Vec::new();
            let mut skipped = 0;
            for row in rows {
                if found.len() >= take {
                    break;
                }
                let instance = row
                    .map_err(db_error(operation))?
                    .into_instance()
                    .map_err(|err| err.into_contract(operation))?;
                if !request.predicate.matches(&instance, request.criteria) {
                    continue;
                }
                if skipped < request.page_start {
                    skipped += 1;
                    continue;
                }
                found.push(instance);
            }
            Ok(found)
        })
    }

    fn add_instance(
        &self,
        _user: &UserId,
        request: &NewInstance,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::AddInstance;
        match (request.type_def.category, &request.ends) {
            (TypeCategory::Classification, _) => {
                return Err(ContractError::operation(
                    operation,
                    "classifications are not standalone instances",
                ));
            }
            (TypeCategory::Relationship, None) => {
                return Err(ContractError::operation(operation, "relationship requires two ends"));
            }
            (TypeCategory::Entity, Some(_)) => {
                return Err(ContractError::operation(operation, "entities cannot carry ends"));
            }
            _ => {}
        }
        let guid = self.identities.next_identity();
        self.transact(operation, |tx| {
            if let Some(ends) = &request.ends {
                for end in [&ends.end_one, &ends.end_two] {
                    let active = load(tx, end)
                        .map_err(|err| err.into_contract(operation))?
                        .is_some_and(|instance| instance.status == InstanceStatus::Active);
                    if !active {
                        return Err(ContractError::not_found(operation, end));
                    }
                }
            }
            if load(tx, &guid).map_err(|err| err.into_contract(operation))?.is_some() {
                return Err(ContractError::conflict(operation, &guid, "identity already in use"));
            }
            let instance = Instance {
                header: InstanceRef {
                    guid: guid.clone(),
                    collection_id: self.collection_id.clone(),
                    type_id: request.type_def.id.clone(),
                    type_name: request.type_def.name.clone(),
                    version: 1,
                },
                properties: request.properties.clone(),
                status: InstanceStatus::Active,
                ends: request.ends.clone(),
            };
            insert(tx, &instance).map_err(|err| err.into_contract(operation))?;
            Ok(Some(instance))
        })
    }

    fn get_instance(
        &self,
        _user: &UserId,
        _type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        self.snapshot(guid)
    }

    fn re_identify(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        old: &InstanceGuid,
        new: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::ReIdentify;
        self.transact(operation, |tx| {
            let mut instance = typed_instance(tx, operation, type_def, old)?;
            if load(tx, new).map_err(|err| err.into_contract(operation))?.is_some() {
                return Err(ContractError::conflict(operation, new, "identity already in use"));
            }
            tx.execute(
                "UPDATE instances SET guid = ?2 WHERE guid = ?1",
                params![old.as_str(), new.as_str()],
            )
            .map_err(db_error(operation))?;
            instance.header.guid = new.clone();
            Ok(Some(instance))
        })
    }

    fn re_type(
        &self,
        _user: &UserId,
        guid: &InstanceGuid,
        current: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::ReType;
        if current.category != target.category {
            return Err(ContractError::operation(
                operation,
                format!("cannot re-type {} to {}", current.category, target.category),
            ));
        }
        self.transact(operation, |tx| {
            let mut instance = typed_instance(tx, operation, current, guid)?;
            instance.header.type_id = target.id.clone();
            instance.header.type_name = target.name.clone();
            instance.header.version += 1;
            update_header(tx, &instance).map_err(|err| err.into_contract(operation))?;
            Ok(Some(instance))
        })
    }

    fn delete(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::Delete;
        self.transact(operation, |tx| {
            let mut instance = typed_instance(tx, operation, type_def, guid)?;
            if instance.status == InstanceStatus::Deleted {
                return Err(ContractError::not_found(operation, guid));
            }
            instance.status = InstanceStatus::Deleted;
            instance.header.version += 1;
            update_header(tx, &instance).map_err(|err| err.into_contract(operation))?;
            Ok(Some(instance))
        })
    }

    fn restore(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::Restore;
        self.transact(operation, |tx| {
            let mut instance = typed_instance(tx, operation, type_def, guid)?;
            if instance.status == InstanceStatus::Active {
                return Err(ContractError::conflict(operation, guid, "instance is not deleted"));
            }
            instance.status = InstanceStatus::Active;
            instance.header.version += 1;
            update_header(tx, &instance).map_err(|err| err.into_contract(operation))?;
            Ok(Some(instance))
        })
    }

    fn purge(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<(), ContractError> {
        let operation = StoreOperation::Purge;
        self.transact(operation, |tx| {
            let instance = typed_instance(tx, operation, type_def, guid)?;
            if instance.status == InstanceStatus::Active {
                return Err(ContractError::conflict(operation, guid, "instance must be deleted first"));
            }
            tx.execute("DELETE FROM instances WHERE guid = ?1", params![guid.as_str()])
                .map_err(db_error(operation))?;
            Ok(())
        })
    }
}

// ============================================================================//
// SECTION: Rows
// ============================================================================//

/// Raw instance row as stored.
struct InstanceRow {
    /// Instance identity.
    guid: String,
    /// Home collection.
    collection_id: String,
    /// Type identifier.
    type_id: String,
    /// Type name.
    type_name: String,
    /// Version counter.
    version: i64,
    /// Status label.
    status: String,
    /// Serialized property map.
    properties_json: String,
    /// Relationship end one.
    end_one: Option<String>,
    /// Relationship end two.
    end_two: Option<String>,
}

impl InstanceRow {
    /// Reads a row selected with [`INSTANCE_COLUMNS`].
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            guid: row.get(0)?,
            collection_id: row.get(1)?,
            type_id: row.get(2)?,
            type_name: row.get(3)?,
            version: row.get(4)?,
            status: row.get(5)?,
            properties_json: row.get(6)?,
            end_one: row.get(7)?,
            end_two: row.get(8)?,
        })
    }

    /// Decodes the row into an instance.
    fn into_instance(self) -> Result<Instance, SqliteStoreError> {
        let version = u64::try_from(self.version).map_err(|_| {
            SqliteStoreError::Corrupt(format!("invalid version for instance {}", self.guid))
        })?;
        let status = parse_status(&self.status)?;
        let properties: InstanceProperties =
            serde_json::from_str(&self.properties_json).map_err(|err| {
                SqliteStoreError::Corrupt(format!("properties of instance {}: {err}", self.guid))
            })?;
        let ends = match (self.end_one, self.end_two) {
            (None, None) => None,
            (Some(end_one), Some(end_two)) => Some(RelationshipEnds {
                end_one: InstanceGuid::new(end_one),
                end_two: InstanceGuid::new(end_two),
            }),
            _ => {
                return Err(SqliteStoreError::Corrupt(format!(
                    "instance {} has a single relationship end",
                    self.guid
                )));
            }
        };
        Ok(Instance {
            header: InstanceRef {
                guid: InstanceGuid::new(self.guid),
                collection_id: MetadataCollectionId::new(self.collection_id),
                type_id: TypeId::new(self.type_id),
                type_name: self.type_name,
                version,
            },
            properties,
            status,
            ends,
        })
    }
}

/// Parses a stored status label.
fn parse_status(label: &str) -> Result<InstanceStatus, SqliteStoreError> {
    match label {
        "active" => Ok(InstanceStatus::Active),
        "deleted" => Ok(InstanceStatus::Deleted),
        other => Err(SqliteStoreError::Corrupt(format!("unknown instance status: {other}"))),
    }
}

/// Loads an instance by identity regardless of status.
fn load(connection: &Connection, guid: &InstanceGuid) -> Result<Option<Instance>, SqliteStoreError> {
    let row = connection
        .query_row(
            &format!("SELECT {INSTANCE_COLUMNS} FROM instances WHERE guid = ?1"),
            params![guid.as_str()],
            InstanceRow::read,
        )
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    row.map(InstanceRow::into_instance).transpose()
}

/// Loads an instance and checks it carries the expected type.
fn typed_instance(
    connection: &Connection,
    operation: StoreOperation,
    type_def: &TypeDescriptor,
    guid: &InstanceGuid,
) -> Result<Instance, ContractError> {
    let instance = load(connection, guid)
        .map_err(|err| err.into_contract(operation))?
        .ok_or_else(|| ContractError::not_found(operation, guid))?;
    if instance.header.type_id != type_def.id {
        return Err(ContractError::conflict(
            operation,
            guid,
            format!("instance is of type {} not {}", instance.header.type_name, type_def.name),
        ));
    }
    Ok(instance)
}

/// Inserts a new instance row.
fn insert(connection: &Connection, instance: &Instance) -> Result<(), SqliteStoreError> {
    let properties_json = serde_json::to_string(&instance.properties)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    let version = i64::try_from(instance.header.version)
        .map_err(|_| SqliteStoreError::Invalid("instance version exceeds range".to_string()))?;
    let (end_one, end_two) = match &instance.ends {
        Some(ends) => (Some(ends.end_one.as_str()), Some(ends.end_two.as_str())),
        None => (None, None),
    };
    connection
        .execute(
            &format!(
                "INSERT INTO instances ({INSTANCE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, \
                 ?9)"
            ),
            params![
                instance.header.guid.as_str(),
                instance.header.collection_id.as_str(),
                instance.header.type_id.as_str(),
                instance.header.type_name,
                version,
                instance.status.as_str(),
                properties_json,
                end_one,
                end_two,
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Writes the mutable header columns (type, version, status) of an instance.
fn update_header(connection: &Connection, instance: &Instance) -> Result<(), SqliteStoreError> {
    let version = i64::try_from(instance.header.version)
        .map_err(|_| SqliteStoreError::Invalid("instance version exceeds range".to_string()))?;
    connection
        .execute(
            "UPDATE instances SET type_id = ?2, type_name = ?3, version = ?4, status = ?5 WHERE \
             guid = ?1",
            params![
                instance.header.guid.as_str(),
                instance.header.type_id.as_str(),
                instance.header.type_name,
                version,
                instance.status.as_str(),
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas; foreign keys carry the relationship cascades.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS instances (
                    guid TEXT PRIMARY KEY,
                    collection_id TEXT NOT NULL,
                    type_id TEXT NOT NULL,
                    type_name TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    properties_json TEXT NOT NULL,
                    end_one TEXT REFERENCES instances(guid)
                        ON UPDATE CASCADE ON DELETE CASCADE,
                    end_two TEXT REFERENCES instances(guid)
                        ON UPDATE CASCADE ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_instances_type_status
                    ON instances (type_id, status);
                CREATE INDEX IF NOT EXISTS idx_instances_end_one ON instances (end_one);
                CREATE INDEX IF NOT EXISTS idx_instances_end_two ON instances (end_two);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================//
// SECTION: Tests
// ============================================================================//

#[cfg(test)]
mod tests {
    use super::parse_status;
    use conformance_core::InstanceStatus;

    #[test]
    fn status_labels_round_trip() {
        for status in [InstanceStatus::Active, InstanceStatus::Deleted] {
            assert_eq!(parse_status(status.as_str()).ok(), Some(status));
        }
        assert!(parse_status("archived").is_err());
    }
}
