// crates/conformance-core/src/runtime/catalog.rs
// ============================================================================
// Module: Static Type Catalog
// Description: Validated, stably ordered in-memory type catalog.
// Purpose: Supply the closed set of type descriptors for one harness run.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`StaticTypeCatalog`] validates a set of descriptors once at construction
//! and then serves them in a stable order (category, name, id) so repeated
//! runs against the same store produce diffable reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::TypeCategory;
use crate::core::TypeDescriptor;
use crate::core::TypeId;
use crate::interfaces::CatalogError;
use crate::interfaces::TypeCatalog;

// ============================================================================
// SECTION: Static Catalog
// ============================================================================

/// Immutable, validated type catalog.
///
/// # Invariants
/// - Type ids are unique.
/// - Supertypes exist, share the subtype's category, and form no cycles.
/// - Relationship types carry ends referencing entity types; other
///   categories carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTypeCatalog {
    /// Descriptors in catalog order.
    types: Vec<TypeDescriptor>,
}

impl StaticTypeCatalog {
    /// Validates and orders a set of descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the descriptors violate catalog invariants.
    pub fn new(mut types: Vec<TypeDescriptor>) -> Result<Self, CatalogError> {
        let mut by_id: BTreeMap<&TypeId, &TypeDescriptor> = BTreeMap::new();
        for descriptor in &types {
            if by_id.insert(&descriptor.id, descriptor).is_some() {
                return Err(CatalogError::DuplicateType(descriptor.id.clone()));
            }
        }
        for descriptor in &types {
            validate_descriptor(descriptor, &by_id)?;
        }
        drop(by_id);
        types.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(Self {
            types,
        })
    }

    /// Returns the descriptors in catalog order.
    #[must_use]
    pub fn descriptors(&self) -> &[TypeDescriptor] {
        &self.types
    }

    /// Looks up a descriptor by identifier.
    #[must_use]
    pub fn get(&self, id: &TypeId) -> Option<&TypeDescriptor> {
        self.types.iter().find(|descriptor| descriptor.id == *id)
    }
}

impl TypeCatalog for StaticTypeCatalog {
    fn types(&self) -> Result<Vec<TypeDescriptor>, CatalogError> {
        Ok(self.types.clone())
    }
}

// ============================================================================
// SECTION: Built-In Catalog
// ============================================================================

/// Returns a small sample catalog covering every category and a subtype chain.
///
/// # Errors
///
/// Returns [`CatalogError`] only if the built-in descriptors are inconsistent.
pub fn builtin_type_catalog() -> Result<StaticTypeCatalog, CatalogError> {
    let referenceable = TypeId::new("a32316b8-dc8c-48c5-b12b-71c1b2a080bf");
    let asset = TypeId::new("896d14c2-7522-4f6c-8519-757711943fe6");
    let glossary_term = TypeId::new("0db3e6ec-f5ef-4d75-ae38-b7ee6fd6ec0a");
    let related_term = TypeId::new("b1161696-e563-4cf9-9fd9-c0c76e47d063");
    StaticTypeCatalog::new(vec![
        TypeDescriptor::entity(referenceable.as_str(), "Referenceable"),
        TypeDescriptor::entity(asset.as_str(), "Asset").with_super_type(referenceable.clone()),
        TypeDescriptor::entity("1449911c-4f44-4c22-abc0-7540154feefb", "DataSet")
            .with_super_type(asset.clone()),
        TypeDescriptor::entity(glossary_term.as_str(), "GlossaryTerm")
            .with_super_type(referenceable),
        TypeDescriptor::relationship(
            "e6670973-645f-441a-bec7-6f5570345b92",
            "SemanticAssignment",
            asset,
            glossary_term.clone(),
        ),
        TypeDescriptor::relationship(
            related_term.as_str(),
            "RelatedTerm",
            glossary_term.clone(),
            glossary_term.clone(),
        ),
        TypeDescriptor::relationship(
            "74f4094d-dba2-4ad9-874e-d422b69947e2",
            "Synonym",
            glossary_term.clone(),
            glossary_term,
        )
        .with_super_type(related_term),
        TypeDescriptor::classification("742ddb7d-9a4a-4eb5-8ac2-1d69953bd2b6", "Confidentiality"),
    ])
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates one descriptor against the full id index.
fn validate_descriptor(
    descriptor: &TypeDescriptor,
    by_id: &BTreeMap<&TypeId, &TypeDescriptor>,
) -> Result<(), CatalogError> {
    if descriptor.name.trim().is_empty() {
        return Err(invalid(descriptor, "type name must not be empty"));
    }
    match (descriptor.category, &descriptor.ends) {
        (TypeCategory::Relationship, None) => {
            return Err(invalid(descriptor, "relationship types must declare end types"));
        }
        (TypeCategory::Relationship, Some(ends)) => {
            for end in [&ends.end_one, &ends.end_two] {
                let Some(end_type) = by_id.get(end) else {
                    return Err(CatalogError::UnknownReference {
                        type_id: descriptor.id.clone(),
                        missing: end.clone(),
                    });
                };
                if end_type.category != TypeCategory::Entity {
                    return Err(invalid(descriptor, "relationship ends must be entity types"));
                }
            }
        }
        (_, Some(_)) => {
            return Err(invalid(descriptor, "only relationship types may declare end types"));
        }
        (_, None) => {}
    }
    let mut current = descriptor;
    let mut depth = 0usize;
    while let Some(super_id) = &current.super_type {
        let Some(super_type) = by_id.get(super_id) else {
            return Err(CatalogError::UnknownReference {
                type_id: current.id.clone(),
                missing: super_id.clone(),
            });
        };
        if super_type.category != descriptor.category {
            return Err(invalid(descriptor, "supertype must share the type category"));
        }
        depth += 1;
        if depth > by_id.len() {
            return Err(invalid(descriptor, "supertype chain contains a cycle"));
        }
        current = super_type;
    }
    Ok(())
}

/// Builds an invalid-descriptor error.
fn invalid(descriptor: &TypeDescriptor, reason: &str) -> CatalogError {
    CatalogError::Invalid {
        type_id: descriptor.id.clone(),
        reason: reason.to_string(),
    }
}
