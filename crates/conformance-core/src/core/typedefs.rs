// crates/conformance-core/src/core/typedefs.rs
// ============================================================================
// Module: Type Descriptors
// Description: Entity, relationship, and classification type descriptors.
// Purpose: Describe the closed set of types exercised by one harness run.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`TypeDescriptor`] is the harness view of one type definition in the TUT
//! type system. Descriptors are immutable once loaded and owned by the type
//! catalog for the lifetime of a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TypeId;

// ============================================================================
// SECTION: Type Category
// ============================================================================

/// Category of a type definition.
///
/// # Invariants
/// - Variant order is the catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    /// Entity (node) type.
    Entity,
    /// Relationship (edge) type between two entities.
    Relationship,
    /// Classification attached to entities.
    Classification,
}

impl TypeCategory {
    /// Returns a stable label for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Relationship => "relationship",
            Self::Classification => "classification",
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Type Descriptor
// ============================================================================

/// Entity types allowed at each end of a relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEndTypes {
    /// Entity type at end one.
    pub end_one: TypeId,
    /// Entity type at end two.
    pub end_two: TypeId,
}

/// Descriptor of one type definition known to the TUT type system.
///
/// # Invariants
/// - `super_type`, when present, names a type of the same category.
/// - `ends` is present only for relationship types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type identifier.
    pub id: TypeId,
    /// Type name, unique in practice and used to derive test case ids.
    pub name: String,
    /// Type category.
    pub category: TypeCategory,
    /// Direct supertype identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type: Option<TypeId>,
    /// Relationship end types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends: Option<RelationshipEndTypes>,
}

impl TypeDescriptor {
    /// Creates an entity type descriptor.
    #[must_use]
    pub fn entity(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TypeId::new(id),
            name: name.into(),
            category: TypeCategory::Entity,
            super_type: None,
            ends: None,
        }
    }

    /// Creates a relationship type descriptor between two entity types.
    #[must_use]
    pub fn relationship(
        id: impl Into<String>,
        name: impl Into<String>,
        end_one: TypeId,
        end_two: TypeId,
    ) -> Self {
        Self {
            id: TypeId::new(id),
            name: name.into(),
            category: TypeCategory::Relationship,
            super_type: None,
            ends: Some(RelationshipEndTypes {
                end_one,
                end_two,
            }),
        }
    }

    /// Creates a classification type descriptor.
    #[must_use]
    pub fn classification(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TypeId::new(id),
            name: name.into(),
            category: TypeCategory::Classification,
            super_type: None,
            ends: None,
        }
    }

    /// Returns the descriptor with the given direct supertype.
    #[must_use]
    pub fn with_super_type(mut self, super_type: TypeId) -> Self {
        self.super_type = Some(super_type);
        self
    }
}
