// crates/conformance-core/tests/memory_store.rs
// ============================================================================
// Module: In-Memory Store Contract Tests
// Description: Contract and referential integrity checks for the reference store.
// Purpose: Ensure the reference store behaves as a conformant TUT.
// Dependencies: conformance-core
// ============================================================================
//! ## Overview
//! Exercises the store contract directly: lifecycle transitions, typed
//! failures, search visibility, and relationship end rewrites under
//! concurrent re-identification.

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

use std::sync::Arc;
use std::thread;

use conformance_core::ContractError;
use conformance_core::InstanceGuid;
use conformance_core::InstanceProperties;
use conformance_core::InstanceStatus;
use conformance_core::InstanceStore;
use conformance_core::MatchCriteria;
use conformance_core::MetadataCollectionId;
use conformance_core::NewInstance;
use conformance_core::PropertyValue;
use conformance_core::RelationshipEnds;
use conformance_core::SearchRequest;
use conformance_core::StoreOperation;
use conformance_core::TypeDescriptor;
use conformance_core::TypeId;
use conformance_core::UserId;
use conformance_core::runtime::InMemoryInstanceStore;
use conformance_core::runtime::SequentialIdentityGenerator;

fn user() -> UserId {
    UserId::new("tester")
}

fn thing() -> TypeDescriptor {
    TypeDescriptor::entity("type-thing", "Thing")
}

fn sub_thing() -> TypeDescriptor {
    TypeDescriptor::entity("type-sub-thing", "SubThing").with_super_type(TypeId::new("type-thing"))
}

fn link() -> TypeDescriptor {
    TypeDescriptor::relationship("type-link", "Link", TypeId::new("type-thing"), TypeId::new("type-thing"))
}

fn store() -> InMemoryInstanceStore {
    InMemoryInstanceStore::new(MetadataCollectionId::new("home"))
        .with_identities(Arc::new(SequentialIdentityGenerator::new("id")))
}

fn add(store: &InMemoryInstanceStore, type_def: &TypeDescriptor, name: &str) -> InstanceGuid {
    let request = NewInstance {
        type_def: type_def.clone(),
        properties: InstanceProperties::new().with_property("name", name),
        ends: None,
    };
    store.add_instance(&user(), &request).unwrap().unwrap().header.guid
}

fn connect(store: &InMemoryInstanceStore, one: &InstanceGuid, two: &InstanceGuid) -> InstanceGuid {
    let request = NewInstance {
        type_def: link(),
        properties: InstanceProperties::new(),
        ends: Some(RelationshipEnds {
            end_one: one.clone(),
            end_two: two.clone(),
        }),
    };
    store.add_instance(&user(), &request).unwrap().unwrap().header.guid
}

fn search(store: &InMemoryInstanceStore, type_def: &TypeDescriptor, predicate: InstanceProperties) -> Vec<InstanceGuid> {
    store
        .search(&user(), &SearchRequest::first_page(type_def.id.clone(), predicate, MatchCriteria::All, 100))
        .unwrap()
        .into_iter()
        .map(|instance| instance.header.guid)
        .collect()
}

#[test]
fn created_instances_are_homed_and_versioned() {
    let store = store();
    let guid = add(&store, &thing(), "a");
    let instance = store.get_instance(&user(), &thing(), &guid).unwrap().unwrap();
    assert_eq!(instance.header.collection_id, MetadataCollectionId::new("home"));
    assert_eq!(instance.header.version, 1);
    assert_eq!(instance.status, InstanceStatus::Active);
}

#[test]
fn relationships_require_existing_ends() {
    let store = store();
    let one = add(&store, &thing(), "a");
    let missing = InstanceGuid::new("missing");
    let request = NewInstance {
        type_def: link(),
        properties: InstanceProperties::new(),
        ends: Some(RelationshipEnds {
            end_one: one,
            end_two: missing.clone(),
        }),
    };
    let err = store.add_instance(&user(), &request).unwrap_err();
    assert_eq!(err, ContractError::not_found(StoreOperation::AddInstance, &missing));
}

#[test]
fn entity_re_identify_rewrites_relationship_ends() {
    let store = store();
    let one = add(&store, &thing(), "a");
    let two = add(&store, &thing(), "b");
    let relationship = connect(&store, &one, &two);
    let fresh = InstanceGuid::new("fresh");

    let moved = store.re_identify(&user(), &thing(), &one, &fresh).unwrap().unwrap();
    assert_eq!(moved.header.guid, fresh);
    assert_eq!(moved.header.version, 1);
    assert_eq!(store.get_instance(&user(), &thing(), &one).unwrap(), None);

    let link_instance = store.snapshot(&relationship).unwrap().unwrap();
    let ends = link_instance.ends.unwrap();
    assert_eq!(ends.end_one, fresh);
    assert_eq!(ends.end_two, two);
}

#[test]
fn re_identify_reports_missing_and_taken_identities() {
    let store = store();
    let one = add(&store, &thing(), "a");
    let two = add(&store, &thing(), "b");
    let ghost = InstanceGuid::new("ghost");

    let err = store.re_identify(&user(), &thing(), &ghost, &InstanceGuid::new("x")).unwrap_err();
    assert_eq!(err, ContractError::not_found(StoreOperation::ReIdentify, &ghost));

    let err = store.re_identify(&user(), &thing(), &one, &two).unwrap_err();
    assert!(matches!(err, ContractError::Conflict { .. }));
    assert!(store.snapshot(&one).unwrap().is_some());
}

#[test]
fn search_matches_exact_type_and_skips_deleted() {
    let store = store();
    let kept = add(&store, &thing(), "a");
    let deleted = add(&store, &thing(), "b");
    let _subtype = add(&store, &sub_thing(), "c");
    store.delete(&user(), &thing(), &deleted).unwrap();

    assert_eq!(search(&store, &thing(), InstanceProperties::new()), vec![kept.clone()]);
    assert_eq!(
        search(&store, &thing(), InstanceProperties::new().with_property("name", "a")),
        vec![kept]
    );
    assert!(search(&store, &thing(), InstanceProperties::new().with_property("name", "b")).is_empty());
    assert_eq!(
        search(&store, &thing(), InstanceProperties::collection_filter(&MetadataCollectionId::new("elsewhere"))),
        Vec::<InstanceGuid>::new()
    );
}

#[test]
fn delete_restore_transitions_status_and_version() {
    let store = store();
    let guid = add(&store, &thing(), "a");
    let deleted = store.delete(&user(), &thing(), &guid).unwrap().unwrap();
    assert_eq!(deleted.status, InstanceStatus::Deleted);
    assert_eq!(deleted.header.version, 2);
    assert!(matches!(store.delete(&user(), &thing(), &guid), Err(ContractError::NotFound { .. })));

    let restored = store.restore(&user(), &thing(), &guid).unwrap().unwrap();
    assert_eq!(restored.status, InstanceStatus::Active);
    assert_eq!(restored.header.version, 3);
    assert!(matches!(store.restore(&user(), &thing(), &guid), Err(ContractError::Conflict { .. })));
}

#[test]
fn purge_requires_soft_delete_and_cascades_to_relationships() {
    let store = store();
    let one = add(&store, &thing(), "a");
    let two = add(&store, &thing(), "b");
    let relationship = connect(&store, &one, &two);

    assert!(matches!(store.purge(&user(), &thing(), &one), Err(ContractError::Conflict { .. })));
    store.delete(&user(), &thing(), &one).unwrap();
    store.purge(&user(), &thing(), &one).unwrap();

    assert_eq!(store.snapshot(&one).unwrap(), None);
    assert_eq!(store.snapshot(&relationship).unwrap(), None);
    assert!(store.snapshot(&two).unwrap().is_some());
}

#[test]
fn re_type_preserves_identity_and_rejects_wrong_current_type() {
    let store = store();
    let guid = add(&store, &thing(), "a");
    let retyped = store.re_type(&user(), &guid, &thing(), &sub_thing()).unwrap().unwrap();
    assert_eq!(retyped.header.guid, guid);
    assert_eq!(retyped.header.type_id, TypeId::new("type-sub-thing"));
    assert_eq!(retyped.properties.get("name"), Some(&PropertyValue::from("a")));

    let err = store.re_type(&user(), &guid, &thing(), &sub_thing()).unwrap_err();
    assert!(matches!(err, ContractError::Conflict { .. }));
}

#[test]
fn search_page_size_is_capped() {
    let store = store().with_max_page_size(2);
    for name in ["a", "b", "c", "d"] {
        add(&store, &thing(), name);
    }
    assert_eq!(search(&store, &thing(), InstanceProperties::new()).len(), 2);
}

#[test]
fn concurrent_re_identify_keeps_relationships_resolvable() {
    let store = store();
    let entities: Vec<InstanceGuid> = (0..16).map(|index| add(&store, &thing(), &format!("e{index}"))).collect();
    let relationships: Vec<InstanceGuid> =
        entities.windows(2).map(|pair| connect(&store, &pair[0], &pair[1])).collect();

    thread::scope(|scope| {
        for (index, guid) in entities.iter().enumerate() {
            let store = &store;
            scope.spawn(move || {
                let fresh = InstanceGuid::new(format!("fresh-{index}"));
                store.re_identify(&user(), &thing(), guid, &fresh).unwrap();
            });
        }
    });

    for relationship in relationships {
        let ends = store.snapshot(&relationship).unwrap().unwrap().ends.unwrap();
        for end in [ends.end_one, ends.end_two] {
            assert!(end.as_str().starts_with("fresh-"));
            assert!(store.snapshot(&end).unwrap().is_some());
        }
    }
}
