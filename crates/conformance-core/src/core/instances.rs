// crates/conformance-core/src/core/instances.rs
// ============================================================================
// Module: Metadata Instances
// Description: Instance headers, typed properties, and search predicates.
// Purpose: Model the values exchanged with a store under test.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Instances are entities or relationships held by a store under test. Each
//! carries an [`InstanceRef`] header (identity, home collection, type,
//! version) and an ordered [`InstanceProperties`] map. The same property map
//! doubles as a search predicate, combined under [`MatchCriteria`].
//!
//! The reserved predicate name [`METADATA_COLLECTION_ID_PROPERTY`] matches the
//! owning collection of an instance rather than a stored property, which lets
//! discovery restrict itself to instances the harness may mutate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::InstanceGuid;
use crate::core::identifiers::MetadataCollectionId;
use crate::core::identifiers::TypeId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Predicate property name that matches the owning metadata collection.
pub const METADATA_COLLECTION_ID_PROPERTY: &str = "metadataCollectionId";

// ============================================================================
// SECTION: Property Values
// ============================================================================

/// Typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// UTF-8 string value.
    String(String),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// Enumerated value.
    Enum {
        /// Ordinal of the enum element.
        ordinal: u32,
        /// Symbolic name of the enum element.
        symbolic_name: String,
    },
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Ordered mapping from property name to typed value.
///
/// # Invariants
/// - Iteration order is by property name, so serialized forms are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceProperties(BTreeMap<String, PropertyValue>);

impl InstanceProperties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the map with one property added or replaced.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Builds the exact-match predicate selecting instances homed in `collection`.
    #[must_use]
    pub fn collection_filter(collection: &MetadataCollectionId) -> Self {
        Self::new().with_property(METADATA_COLLECTION_ID_PROPERTY, collection.as_str())
    }

    /// Returns a property value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no properties are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates properties in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
        self.0.iter()
    }

    /// Evaluates this map as a predicate against an instance.
    ///
    /// An empty predicate matches every instance regardless of `criteria`.
    #[must_use]
    pub fn matches(&self, instance: &Instance, criteria: MatchCriteria) -> bool {
        if self.is_empty() {
            return true;
        }
        let collection_value = PropertyValue::String(instance.header.collection_id.to_string());
        let mut hits = self.iter().map(|(name, expected)| {
            let actual = if name == METADATA_COLLECTION_ID_PROPERTY {
                Some(&collection_value)
            } else {
                instance.properties.get(name)
            };
            actual == Some(expected)
        });
        match criteria {
            MatchCriteria::All => hits.all(|hit| hit),
            MatchCriteria::Any => hits.any(|hit| hit),
            MatchCriteria::None => !hits.any(|hit| hit),
        }
    }
}

impl<'a> IntoIterator for &'a InstanceProperties {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// SECTION: Match Criteria
// ============================================================================

/// Predicate combinator applied to a property filter during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriteria {
    /// Every predicate property must match.
    #[default]
    All,
    /// At least one predicate property must match.
    Any,
    /// No predicate property may match.
    None,
}

// ============================================================================
// SECTION: Instances
// ============================================================================

/// Lifecycle status of a stored instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Instance is active and visible to search.
    Active,
    /// Instance is soft-deleted and may be restored or purged.
    Deleted,
}

impl InstanceStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

/// Identity header of a stored instance.
///
/// # Invariants
/// - `guid` changes only through re-identification.
/// - `version` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Instance identity.
    pub guid: InstanceGuid,
    /// Owning (home) metadata collection.
    pub collection_id: MetadataCollectionId,
    /// Type identifier.
    pub type_id: TypeId,
    /// Type name.
    pub type_name: String,
    /// Version counter.
    pub version: u64,
}

/// Entity identities at the two ends of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEnds {
    /// Entity at end one.
    pub end_one: InstanceGuid,
    /// Entity at end two.
    pub end_two: InstanceGuid,
}

impl RelationshipEnds {
    /// Returns true when either end references `guid`.
    #[must_use]
    pub fn references(&self, guid: &InstanceGuid) -> bool {
        self.end_one == *guid || self.end_two == *guid
    }
}

/// Stored entity or relationship instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Identity header.
    pub header: InstanceRef,
    /// Instance properties.
    pub properties: InstanceProperties,
    /// Lifecycle status.
    pub status: InstanceStatus,
    /// Relationship ends (relationships only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends: Option<RelationshipEnds>,
}

impl Instance {
    /// Returns the instance identity.
    #[must_use]
    pub const fn guid(&self) -> &InstanceGuid {
        &self.header.guid
    }
}
