// crates/conformance-core/src/interfaces/mod.rs
// ============================================================================
// Module: Conformance Interfaces
// Description: Store contract and type catalog boundaries.
// Purpose: Define the surfaces a technology under test must implement.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! [`InstanceStore`] is the metadata-instance-store contract exercised by the
//! harness. Every call returns either a typed result or a [`ContractError`];
//! optional operations default to [`ContractError::CapabilityUnsupported`] so
//! a minimal store only implements search, creation, and retrieval.
//!
//! Stores own referential integrity: after an entity is re-identified, any
//! relationship that referenced the old identity must resolve through the new
//! one without repair calls from the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Instance;
use crate::core::InstanceGuid;
use crate::core::InstanceProperties;
use crate::core::MatchCriteria;
use crate::core::MetadataCollectionId;
use crate::core::RelationshipEnds;
use crate::core::StoreOperation;
use crate::core::TypeDescriptor;
use crate::core::TypeId;
use crate::core::UserId;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Property search request.
///
/// # Invariants
/// - `page_start` and `page_size` are advisory; stores may cap page size.
/// - At most `limit` instances are returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Exact type to search.
    pub type_id: TypeId,
    /// Property predicate.
    pub predicate: InstanceProperties,
    /// Predicate combinator.
    pub criteria: MatchCriteria,
    /// Offset of the first result.
    pub page_start: usize,
    /// Requested page size.
    pub page_size: usize,
    /// Maximum number of results.
    pub limit: usize,
}

impl SearchRequest {
    /// Builds a first-page search returning at most `limit` instances.
    #[must_use]
    pub const fn first_page(
        type_id: TypeId,
        predicate: InstanceProperties,
        criteria: MatchCriteria,
        limit: usize,
    ) -> Self {
        Self {
            type_id,
            predicate,
            criteria,
            page_start: 0,
            page_size: limit,
            limit,
        }
    }
}

/// Instance creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInstance {
    /// Type of the new instance.
    pub type_def: TypeDescriptor,
    /// Initial properties.
    pub properties: InstanceProperties,
    /// Relationship ends (relationships only).
    pub ends: Option<RelationshipEnds>,
}

// ============================================================================
// SECTION: Contract Errors
// ============================================================================

/// Typed failures returned by store contract calls.
///
/// # Invariants
/// - Variants are stable for programmatic classification.
/// - [`ContractError::CapabilityUnsupported`] is raised explicitly and never
///   inferred from an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The store does not implement the optional operation.
    #[error("{operation} is not supported by the store")]
    CapabilityUnsupported {
        /// Operation attempted.
        operation: StoreOperation,
    },
    /// The addressed instance does not exist.
    #[error("{operation}: instance {guid} not found")]
    NotFound {
        /// Operation attempted.
        operation: StoreOperation,
        /// Identity addressed.
        guid: InstanceGuid,
    },
    /// The operation conflicts with current store state.
    #[error("{operation}: conflict on instance {guid}: {reason}")]
    Conflict {
        /// Operation attempted.
        operation: StoreOperation,
        /// Identity involved.
        guid: InstanceGuid,
        /// Conflict reason.
        reason: String,
    },
    /// Transport, validation, or unexpected failure.
    #[error("{operation} failed: {message}")]
    OperationError {
        /// Operation attempted.
        operation: StoreOperation,
        /// Failure message.
        message: String,
    },
}

impl ContractError {
    /// Builds a capability-unsupported error.
    #[must_use]
    pub const fn unsupported(operation: StoreOperation) -> Self {
        Self::CapabilityUnsupported {
            operation,
        }
    }

    /// Builds a not-found error.
    #[must_use]
    pub fn not_found(operation: StoreOperation, guid: &InstanceGuid) -> Self {
        Self::NotFound {
            operation,
            guid: guid.clone(),
        }
    }

    /// Builds a conflict error.
    #[must_use]
    pub fn conflict(
        operation: StoreOperation,
        guid: &InstanceGuid,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            operation,
            guid: guid.clone(),
            reason: reason.into(),
        }
    }

    /// Builds an operation error.
    #[must_use]
    pub fn operation(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::OperationError {
            operation,
            message: message.into(),
        }
    }

    /// Returns the operation that raised the error.
    #[must_use]
    pub const fn operation_name(&self) -> StoreOperation {
        match self {
            Self::CapabilityUnsupported {
                operation,
            }
            | Self::NotFound {
                operation, ..
            }
            | Self::Conflict {
                operation, ..
            }
            | Self::OperationError {
                operation, ..
            } => *operation,
        }
    }
}

// ============================================================================
// SECTION: Instance Store
// ============================================================================

/// Metadata-instance-store contract implemented by a technology under test.
///
/// Implementations are shared across harness worker threads and must be
/// `Send + Sync`. Calls are treated as blocking.
pub trait InstanceStore: Send + Sync {
    /// Returns the identifier of the collection this store homes instances in.
    fn metadata_collection_id(&self) -> MetadataCollectionId;

    /// Declares whether concurrent identity mutation is safe on this store.
    fn supports_concurrent_mutation(&self) -> bool {
        false
    }

    /// Searches active instances of one type by property predicate.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when the search fails or is unsupported.
    fn search(&self, user: &UserId, request: &SearchRequest)
    -> Result<Vec<Instance>, ContractError>;

    /// Creates a new instance homed in this store's collection.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when creation fails or is unsupported.
    fn add_instance(
        &self,
        user: &UserId,
        request: &NewInstance,
    ) -> Result<Option<Instance>, ContractError>;

    /// Retrieves an instance by identity; `Ok(None)` when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when retrieval fails or is unsupported.
    fn get_instance(
        &self,
        user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError>;

    /// Atomically replaces the identity of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotFound`] when `old` is unknown,
    /// [`ContractError::Conflict`] when `new` is in use, or
    /// [`ContractError::CapabilityUnsupported`] when not implemented.
    fn re_identify(
        &self,
        _user: &UserId,
        _type_def: &TypeDescriptor,
        _old: &InstanceGuid,
        _new: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        Err(ContractError::unsupported(StoreOperation::ReIdentify))
    }

    /// Changes the type of an instance, preserving identity and properties.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when re-typing fails or is unsupported.
    fn re_type(
        &self,
        _user: &UserId,
        _guid: &InstanceGuid,
        _current: &TypeDescriptor,
        _target: &TypeDescriptor,
    ) -> Result<Option<Instance>, ContractError> {
        Err(ContractError::unsupported(StoreOperation::ReType))
    }

    /// Soft-deletes an active instance.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when deletion fails or is unsupported.
    fn delete(
        &self,
        _user: &UserId,
        _type_def: &TypeDescriptor,
        _guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        Err(ContractError::unsupported(StoreOperation::Delete))
    }

    /// Restores a soft-deleted instance.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when restoration fails or is unsupported.
    fn restore(
        &self,
        _user: &UserId,
        _type_def: &TypeDescriptor,
        _guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        Err(ContractError::unsupported(StoreOperation::Restore))
    }

    /// Permanently removes an instance (and, for entities, its relationships).
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when purging fails or is unsupported.
    fn purge(
        &self,
        _user: &UserId,
        _type_def: &TypeDescriptor,
        _guid: &InstanceGuid,
    ) -> Result<(), ContractError> {
        Err(ContractError::unsupported(StoreOperation::Purge))
    }
}

// ============================================================================
// SECTION: Type Catalog
// ============================================================================

/// Type catalog errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Two descriptors share an identifier.
    #[error("duplicate type id: {0}")]
    DuplicateType(TypeId),
    /// A descriptor references an unknown type.
    #[error("type {type_id} references unknown type {missing}")]
    UnknownReference {
        /// Referencing type.
        type_id: TypeId,
        /// Missing type.
        missing: TypeId,
    },
    /// A descriptor is internally inconsistent.
    #[error("invalid type {type_id}: {reason}")]
    Invalid {
        /// Offending type.
        type_id: TypeId,
        /// Validation failure.
        reason: String,
    },
    /// The catalog source could not be read.
    #[error("type catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only enumeration of the types exercised by one run.
pub trait TypeCatalog {
    /// Returns every descriptor in stable catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be produced.
    fn types(&self) -> Result<Vec<TypeDescriptor>, CatalogError>;
}
