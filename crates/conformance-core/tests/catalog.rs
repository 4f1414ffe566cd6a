// crates/conformance-core/tests/catalog.rs
// ============================================================================
// Module: Type Catalog Tests
// Description: Validation and ordering of static type catalogs.
// Purpose: Ensure catalogs are stable and reject inconsistent descriptors.
// Dependencies: conformance-core
// ============================================================================
//! ## Overview
//! Checks catalog ordering (category, name, id) and every validation rule.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use conformance_core::CatalogError;
use conformance_core::TypeCatalog;
use conformance_core::TypeCategory;
use conformance_core::TypeDescriptor;
use conformance_core::TypeId;
use conformance_core::runtime::StaticTypeCatalog;
use conformance_core::runtime::builtin_type_catalog;

#[test]
fn catalog_orders_by_category_then_name() {
    let catalog = StaticTypeCatalog::new(vec![
        TypeDescriptor::classification("c1", "Tag"),
        TypeDescriptor::relationship("r1", "Link", TypeId::new("e2"), TypeId::new("e1")),
        TypeDescriptor::entity("e2", "Beta"),
        TypeDescriptor::entity("e1", "Alpha"),
    ])
    .unwrap();
    let names: Vec<String> = catalog.types().unwrap().into_iter().map(|descriptor| descriptor.name).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Link", "Tag"]);
    assert_eq!(catalog.get(&TypeId::new("r1")).map(|descriptor| descriptor.category), Some(TypeCategory::Relationship));
}

#[test]
fn duplicate_ids_are_rejected() {
    let err = StaticTypeCatalog::new(vec![TypeDescriptor::entity("e1", "A"), TypeDescriptor::entity("e1", "B")])
        .unwrap_err();
    assert_eq!(err, CatalogError::DuplicateType(TypeId::new("e1")));
}

#[test]
fn unknown_supertypes_and_ends_are_rejected() {
    let err = StaticTypeCatalog::new(vec![TypeDescriptor::entity("e1", "A").with_super_type(TypeId::new("nope"))])
        .unwrap_err();
    assert!(matches!(err, CatalogError::UnknownReference { .. }));

    let err = StaticTypeCatalog::new(vec![
        TypeDescriptor::entity("e1", "A"),
        TypeDescriptor::relationship("r1", "Link", TypeId::new("e1"), TypeId::new("missing")),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        CatalogError::UnknownReference {
            type_id: TypeId::new("r1"),
            missing: TypeId::new("missing"),
        }
    );
}

#[test]
fn relationship_ends_must_be_entities() {
    let err = StaticTypeCatalog::new(vec![
        TypeDescriptor::classification("c1", "Tag"),
        TypeDescriptor::relationship("r1", "Link", TypeId::new("c1"), TypeId::new("c1")),
    ])
    .unwrap_err();
    assert!(matches!(err, CatalogError::Invalid { .. }));
}

#[test]
fn supertype_cycles_and_category_mismatches_are_rejected() {
    let err = StaticTypeCatalog::new(vec![
        TypeDescriptor::entity("a", "A").with_super_type(TypeId::new("b")),
        TypeDescriptor::entity("b", "B").with_super_type(TypeId::new("a")),
    ])
    .unwrap_err();
    assert!(matches!(err, CatalogError::Invalid { .. }));

    let err = StaticTypeCatalog::new(vec![
        TypeDescriptor::classification("c", "C"),
        TypeDescriptor::entity("a", "A").with_super_type(TypeId::new("c")),
    ])
    .unwrap_err();
    assert!(matches!(err, CatalogError::Invalid { .. }));
}

#[test]
fn builtin_catalog_covers_every_category() {
    let catalog = builtin_type_catalog().unwrap();
    for category in [TypeCategory::Entity, TypeCategory::Relationship, TypeCategory::Classification] {
        assert!(catalog.descriptors().iter().any(|descriptor| descriptor.category == category));
    }
}
