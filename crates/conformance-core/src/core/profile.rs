// crates/conformance-core/src/core/profile.rs
// ============================================================================
// Module: Performance Profiles
// Description: Closed set of operation categories used to bucket evidence.
// Purpose: Name the profiles and operation families known at build time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PerformanceProfile`] buckets timing samples and outcomes for one kind
//! of operation on one category of instance. An [`OperationFamily`] groups
//! the contract calls one test unit performs; a family may record evidence
//! under several profiles (for example delete and restore).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::typedefs::TypeCategory;

// ============================================================================
// SECTION: Profile Kinds
// ============================================================================

/// Operation kind a profile measures, independent of instance category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Instance creation.
    Creation,
    /// Property search.
    Search,
    /// Identity re-assignment.
    ReIdentify,
    /// Type re-assignment.
    ReType,
    /// Soft delete.
    Delete,
    /// Restore of a soft-deleted instance.
    Restore,
    /// Permanent removal.
    Purge,
}

// ============================================================================
// SECTION: Performance Profile
// ============================================================================

/// Performance profile bucketing evidence for one operation category.
///
/// # Invariants
/// - The set is closed; [`PerformanceProfile::ALL`] lists every variant in
///   report order.
/// - Profile ids are stable and used as report keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceProfile {
    /// Entity creation.
    EntityCreation,
    /// Relationship creation.
    RelationshipCreation,
    /// Entity property search.
    EntitySearch,
    /// Relationship property search.
    RelationshipSearch,
    /// Entity re-identification.
    EntityReIdentify,
    /// Relationship re-identification.
    RelationshipReIdentify,
    /// Entity re-typing.
    EntityReType,
    /// Relationship re-typing.
    RelationshipReType,
    /// Entity soft delete.
    EntityDelete,
    /// Relationship soft delete.
    RelationshipDelete,
    /// Entity restore.
    EntityRestore,
    /// Relationship restore.
    RelationshipRestore,
    /// Entity purge.
    EntityPurge,
    /// Relationship purge.
    RelationshipPurge,
}

impl PerformanceProfile {
    /// Every profile in report order.
    pub const ALL: [Self; 14] = [
        Self::EntityCreation,
        Self::RelationshipCreation,
        Self::EntitySearch,
        Self::RelationshipSearch,
        Self::EntityReIdentify,
        Self::RelationshipReIdentify,
        Self::EntityReType,
        Self::RelationshipReType,
        Self::EntityDelete,
        Self::RelationshipDelete,
        Self::EntityRestore,
        Self::RelationshipRestore,
        Self::EntityPurge,
        Self::RelationshipPurge,
    ];

    /// Resolves the profile for a category and operation kind.
    ///
    /// Returns `None` for classification types, which have no instance profiles.
    #[must_use]
    pub const fn from_parts(category: TypeCategory, kind: ProfileKind) -> Option<Self> {
        let profile = match (category, kind) {
            (TypeCategory::Classification, _) => return None,
            (TypeCategory::Entity, ProfileKind::Creation) => Self::EntityCreation,
            (TypeCategory::Entity, ProfileKind::Search) => Self::EntitySearch,
            (TypeCategory::Entity, ProfileKind::ReIdentify) => Self::EntityReIdentify,
            (TypeCategory::Entity, ProfileKind::ReType) => Self::EntityReType,
            (TypeCategory::Entity, ProfileKind::Delete) => Self::EntityDelete,
            (TypeCategory::Entity, ProfileKind::Restore) => Self::EntityRestore,
            (TypeCategory::Entity, ProfileKind::Purge) => Self::EntityPurge,
            (TypeCategory::Relationship, ProfileKind::Creation) => Self::RelationshipCreation,
            (TypeCategory::Relationship, ProfileKind::Search) => Self::RelationshipSearch,
            (TypeCategory::Relationship, ProfileKind::ReIdentify) => Self::RelationshipReIdentify,
            (TypeCategory::Relationship, ProfileKind::ReType) => Self::RelationshipReType,
            (TypeCategory::Relationship, ProfileKind::Delete) => Self::RelationshipDelete,
            (TypeCategory::Relationship, ProfileKind::Restore) => Self::RelationshipRestore,
            (TypeCategory::Relationship, ProfileKind::Purge) => Self::RelationshipPurge,
        };
        Some(profile)
    }

    /// Returns the stable profile identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::EntityCreation => "entity-creation",
            Self::RelationshipCreation => "relationship-creation",
            Self::EntitySearch => "entity-search",
            Self::RelationshipSearch => "relationship-search",
            Self::EntityReIdentify => "entity-re-identify",
            Self::RelationshipReIdentify => "relationship-re-identify",
            Self::EntityReType => "entity-re-type",
            Self::RelationshipReType => "relationship-re-type",
            Self::EntityDelete => "entity-delete",
            Self::RelationshipDelete => "relationship-delete",
            Self::EntityRestore => "entity-restore",
            Self::RelationshipRestore => "relationship-restore",
            Self::EntityPurge => "entity-purge",
            Self::RelationshipPurge => "relationship-purge",
        }
    }

    /// Returns a human-readable description of what the profile measures.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::EntityCreation => "Creation of homed entity instances.",
            Self::RelationshipCreation => "Creation of homed relationship instances.",
            Self::EntitySearch => "Property search over homed entity instances.",
            Self::RelationshipSearch => "Property search over homed relationship instances.",
            Self::EntityReIdentify => "Identity re-assignment of homed entity instances.",
            Self::RelationshipReIdentify => {
                "Identity re-assignment of homed relationship instances."
            }
            Self::EntityReType => "Re-typing of homed entity instances to a subtype.",
            Self::RelationshipReType => "Re-typing of homed relationship instances to a subtype.",
            Self::EntityDelete => "Soft delete of homed entity instances.",
            Self::RelationshipDelete => "Soft delete of homed relationship instances.",
            Self::EntityRestore => "Restore of soft-deleted entity instances.",
            Self::RelationshipRestore => "Restore of soft-deleted relationship instances.",
            Self::EntityPurge => "Permanent removal of homed entity instances.",
            Self::RelationshipPurge => "Permanent removal of homed relationship instances.",
        }
    }
}

impl fmt::Display for PerformanceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ============================================================================
// SECTION: Operation Families
// ============================================================================

/// Group of contract calls exercised by one test unit.
///
/// # Invariants
/// - Variant order is the default execution order of families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationFamily {
    /// Create N instances of the type.
    Create,
    /// Re-identify every discovered instance.
    ReIdentify,
    /// Re-type every discovered instance to a direct subtype.
    ReType,
    /// Soft delete then restore every discovered instance.
    DeleteRestore,
    /// Soft delete then purge every discovered instance.
    Purge,
}

impl OperationFamily {
    /// Every family in default execution order.
    pub const ALL: [Self; 5] =
        [Self::Create, Self::ReIdentify, Self::ReType, Self::DeleteRestore, Self::Purge];

    /// Returns the stable family label used in test case identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::ReIdentify => "re-identify",
            Self::ReType => "re-type",
            Self::DeleteRestore => "delete-restore",
            Self::Purge => "purge",
        }
    }
}

impl fmt::Display for OperationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Store Operations
// ============================================================================

/// Contract operation names used in evidence and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreOperation {
    /// Property search.
    Search,
    /// Instance creation.
    AddInstance,
    /// Instance retrieval by identity.
    GetInstance,
    /// Identity re-assignment.
    ReIdentify,
    /// Type re-assignment.
    ReType,
    /// Soft delete.
    Delete,
    /// Restore of a soft-deleted instance.
    Restore,
    /// Permanent removal.
    Purge,
}

impl StoreOperation {
    /// Returns the stable operation label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::AddInstance => "add-instance",
            Self::GetInstance => "get-instance",
            Self::ReIdentify => "re-identify",
            Self::ReType => "re-type",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Purge => "purge",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
