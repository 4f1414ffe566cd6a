// crates/conformance-core/tests/runner.rs
// ============================================================================
// Module: Harness Runner Tests
// Description: End-to-end runs, scheduling, timeout, and cancellation.
// Purpose: Validate phase ordering and that interrupted runs keep evidence.
// Dependencies: conformance-core
// ============================================================================
//! ## Overview
//! Runs the full schedule against the in-memory store and checks report
//! totals, unit records, lifecycle events, and stop handling.

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
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use conformance_core::ContractError;
use conformance_core::Instance;
use conformance_core::InstanceGuid;
use conformance_core::InstanceStore;
use conformance_core::MetadataCollectionId;
use conformance_core::NewInstance;
use conformance_core::OperationFamily;
use conformance_core::Outcome;
use conformance_core::PerformanceProfile;
use conformance_core::SearchRequest;
use conformance_core::StoreOperation;
use conformance_core::TypeCatalog;
use conformance_core::TypeDescriptor;
use conformance_core::TypeId;
use conformance_core::UserId;
use conformance_core::runtime::CancellationToken;
use conformance_core::runtime::HarnessEventKind;
use conformance_core::runtime::HarnessRunner;
use conformance_core::runtime::IdentityGenerator;
use conformance_core::runtime::InMemoryInstanceStore;
use conformance_core::runtime::MemoryEventSink;
use conformance_core::runtime::RunOptions;
use conformance_core::runtime::SequentialIdentityGenerator;
use conformance_core::runtime::SerializePolicy;
use conformance_core::runtime::StaticTypeCatalog;
use conformance_core::runtime::StopReason;
use conformance_core::runtime::TutIdentity;
use conformance_core::runtime::UnitPhase;
use conformance_core::runtime::UnitRecord;
use conformance_core::runtime::UnitStatus;
use conformance_core::runtime::WorkContext;
use conformance_core::runtime::builtin_type_catalog;
use conformance_core::runtime::plan_units;

fn collection() -> MetadataCollectionId {
    MetadataCollectionId::new("tut-collection")
}

fn context(store: Arc<dyn InstanceStore>, instances_per_type: usize) -> WorkContext {
    WorkContext::new(
        store,
        TutIdentity {
            server_name: "memory-tut".to_string(),
            collection_id: collection(),
        },
        UserId::new("conformance-user"),
        instances_per_type,
    )
}

/// Store that requests cancellation on its first creation call.
struct CancellingStore {
    inner: InMemoryInstanceStore,
    token: CancellationToken,
}

impl InstanceStore for CancellingStore {
    fn metadata_collection_id(&self) -> MetadataCollectionId {
        self.inner.metadata_collection_id()
    }

    fn search(&self, user: &UserId, request: &SearchRequest) -> Result<Vec<Instance>, ContractError> {
        self.inner.search(user, request)
    }

    fn add_instance(&self, user: &UserId, request: &NewInstance) -> Result<Option<Instance>, ContractError> {
        self.token.cancel();
        self.inner.add_instance(user, request)
    }

    fn get_instance(
        &self,
        user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        self.inner.get_instance(user, type_def, guid)
    }
}

/// Store that panics when creating instances of one entity type.
struct CrashingStore {
    inner: InMemoryInstanceStore,
    panic_on: &'static str,
}

impl InstanceStore for CrashingStore {
    fn metadata_collection_id(&self) -> MetadataCollectionId {
        self.inner.metadata_collection_id()
    }

    fn search(&self, user: &UserId, request: &SearchRequest) -> Result<Vec<Instance>, ContractError> {
        self.inner.search(user, request)
    }

    fn add_instance(&self, user: &UserId, request: &NewInstance) -> Result<Option<Instance>, ContractError> {
        assert_ne!(request.type_def.name, self.panic_on, "backend crashed");
        self.inner.add_instance(user, request)
    }

    fn get_instance(
        &self,
        user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        self.inner.get_instance(user, type_def, guid)
    }

    fn re_identify(
        &self,
        user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
        new_guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        self.inner.re_identify(user, type_def, guid, new_guid)
    }
}

/// Store whose re-identify of one relationship type reports `NotFound` on
/// the first call and `OperationError` afterwards.
struct FlakyStore {
    inner: InMemoryInstanceStore,
    flaky_type: &'static str,
    calls: AtomicUsize,
}

impl InstanceStore for FlakyStore {
    fn metadata_collection_id(&self) -> MetadataCollectionId {
        self.inner.metadata_collection_id()
    }

    fn search(&self, user: &UserId, request: &SearchRequest) -> Result<Vec<Instance>, ContractError> {
        self.inner.search(user, request)
    }

    fn add_instance(&self, user: &UserId, request: &NewInstance) -> Result<Option<Instance>, ContractError> {
        self.inner.add_instance(user, request)
    }

    fn get_instance(
        &self,
        user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        self.inner.get_instance(user, type_def, guid)
    }

    fn re_identify(
        &self,
        user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
        new_guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        if type_def.name != self.flaky_type {
            return self.inner.re_identify(user, type_def, guid, new_guid);
        }
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(ContractError::not_found(StoreOperation::ReIdentify, guid))
        } else {
            Err(ContractError::operation(StoreOperation::ReIdentify, "backend unavailable"))
        }
    }
}

/// Identity source that always panics.
struct ExhaustedIdentities;

impl IdentityGenerator for ExhaustedIdentities {
    fn next_identity(&self) -> InstanceGuid {
        panic!("identity source exhausted");
    }
}

fn unit<'r>(units: &'r [UnitRecord], family: OperationFamily, type_name: &str) -> &'r UnitRecord {
    units.iter().find(|unit| unit.family == family && unit.type_name == type_name).unwrap()
}

#[test]
fn full_run_against_reference_store_has_no_failures() {
    let catalog = builtin_type_catalog().unwrap();
    let store = InMemoryInstanceStore::new(collection());
    let ctx = context(Arc::new(store), 3);
    let runner = HarnessRunner::new(RunOptions::default());

    let outcome = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap();
    let report = outcome.report;
    assert_eq!(outcome.stopped, None);
    assert_eq!(outcome.worker_panics, 0);
    assert!(!report.interrupted);
    assert_eq!(report.totals.fail, 0);
    assert_eq!(report.totals.unsupported, 0);
    assert_eq!(report.totals.units_aborted, 0);
    assert_eq!(report.totals.units_skipped, 0);

    let planned = plan_units(&catalog.types().unwrap(), &OperationFamily::ALL).len();
    assert_eq!(report.units.len(), planned);
    assert_eq!(report.totals.units_completed, planned);
    assert!(report.units.windows(2).all(|pair| pair[0].unit_index < pair[1].unit_index));

    assert_eq!(report.profile(PerformanceProfile::EntityCreation).unwrap().pass, 12);
    assert_eq!(report.profile(PerformanceProfile::RelationshipCreation).unwrap().pass, 9);
    assert_eq!(report.profile(PerformanceProfile::RelationshipReType).unwrap().pass, 3);
    assert_eq!(report.profiles.len(), PerformanceProfile::ALL.len());
    assert!(
        report
            .assertions
            .windows(2)
            .all(|pair| (pair[0].unit_index, pair[0].sequence) < (pair[1].unit_index, pair[1].sequence))
    );
}

#[test]
fn cancelled_before_start_skips_every_unit() {
    let catalog = builtin_type_catalog().unwrap();
    let ctx = context(Arc::new(InMemoryInstanceStore::new(collection())), 3);
    let token = CancellationToken::new();
    token.cancel();

    let outcome = HarnessRunner::default().run(&ctx, &catalog, &token).unwrap();
    assert_eq!(outcome.stopped, Some(StopReason::Cancelled));
    assert!(outcome.report.interrupted);
    assert_eq!(outcome.report.totals.assertions, 0);
    assert_eq!(outcome.report.totals.units_skipped, outcome.report.units.len());
    assert!(
        outcome
            .report
            .units
            .iter()
            .all(|unit| matches!(unit.status, UnitStatus::Skipped { .. }))
    );
}

#[test]
fn elapsed_deadline_reports_timeout() {
    let catalog = builtin_type_catalog().unwrap();
    let ctx = context(Arc::new(InMemoryInstanceStore::new(collection())), 3);
    let runner = HarnessRunner::new(RunOptions {
        timeout: Some(Duration::ZERO),
        ..RunOptions::default()
    });

    let outcome = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap();
    assert_eq!(outcome.stopped, Some(StopReason::TimedOut));
    assert_eq!(outcome.report.totals.units_completed, 0);
}

#[test]
fn in_flight_unit_finishes_after_cancellation() {
    let catalog = builtin_type_catalog().unwrap();
    let token = CancellationToken::new();
    let store = CancellingStore {
        inner: InMemoryInstanceStore::new(collection()),
        token: token.clone(),
    };
    let ctx = context(Arc::new(store), 3);
    let runner = HarnessRunner::new(RunOptions {
        serialize: SerializePolicy::Always,
        ..RunOptions::default()
    });

    let outcome = runner.run(&ctx, &catalog, &token).unwrap();
    let report = outcome.report;
    assert_eq!(outcome.stopped, Some(StopReason::Cancelled));
    assert_eq!(report.totals.units_completed, 1);
    assert_eq!(report.totals.units_skipped, report.units.len() - 1);
    assert_eq!(report.units[0].assertions, 3);
    assert_eq!(report.profile(PerformanceProfile::EntityCreation).unwrap().pass, 3);
}

#[test]
fn serialize_policy_controls_worker_width() {
    let concurrent = InMemoryInstanceStore::new(collection());
    let serial = InMemoryInstanceStore::new(collection()).with_concurrent_mutation(false);
    let options = |serialize| RunOptions {
        workers: 8,
        serialize,
        ..RunOptions::default()
    };

    assert_eq!(HarnessRunner::new(options(SerializePolicy::Auto)).effective_width(&concurrent), 8);
    assert_eq!(HarnessRunner::new(options(SerializePolicy::Auto)).effective_width(&serial), 1);
    assert_eq!(HarnessRunner::new(options(SerializePolicy::Never)).effective_width(&serial), 8);
    assert_eq!(HarnessRunner::new(options(SerializePolicy::Always)).effective_width(&concurrent), 1);
}

#[test]
fn family_selection_limits_the_schedule() {
    let catalog = builtin_type_catalog().unwrap();
    let ctx = context(Arc::new(InMemoryInstanceStore::new(collection())), 2);
    let runner = HarnessRunner::new(RunOptions {
        families: vec![OperationFamily::Create],
        ..RunOptions::default()
    });

    let report = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap().report;
    assert!(report.units.iter().all(|unit| unit.family == OperationFamily::Create));
    assert_eq!(report.profile(PerformanceProfile::EntityReIdentify).unwrap().total, 0);
}

#[test]
fn lifecycle_events_bracket_the_run() {
    let catalog = builtin_type_catalog().unwrap();
    let sink = Arc::new(MemoryEventSink::new());
    let ctx = context(Arc::new(InMemoryInstanceStore::new(collection())), 1).with_events(sink.clone());
    let runner = HarnessRunner::new(RunOptions {
        families: vec![OperationFamily::Create],
        ..RunOptions::default()
    });

    let report = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap().report;
    let events = sink.events();
    assert!(matches!(events.first().map(|event| &event.kind), Some(HarnessEventKind::RunStarted { .. })));
    assert!(matches!(
        events.last().map(|event| &event.kind),
        Some(HarnessEventKind::RunFinished { interrupted: false, .. })
    ));
    let phases = events
        .iter()
        .filter(|event| matches!(event.kind, HarnessEventKind::PhaseStarted { .. }))
        .count();
    assert_eq!(phases, 2);
    let finished = events
        .iter()
        .filter(|event| matches!(event.kind, HarnessEventKind::UnitFinished { .. }))
        .count();
    assert_eq!(finished, report.totals.units_completed);
}

#[test]
fn outcome_digest_is_stable_across_identical_runs() {
    let catalog = builtin_type_catalog().unwrap();
    let run = || {
        let ctx = context(Arc::new(InMemoryInstanceStore::new(collection())), 2);
        let runner = HarnessRunner::new(RunOptions {
            serialize: SerializePolicy::Always,
            ..RunOptions::default()
        });
        runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap().report.outcome_digest
    };
    assert_eq!(run(), run());
}

#[test]
fn panicking_store_call_aborts_only_its_unit() {
    let catalog = StaticTypeCatalog::new(vec![
        TypeDescriptor::entity("type-a", "A"),
        TypeDescriptor::entity("type-b", "B"),
    ])
    .unwrap();
    let store = CrashingStore {
        inner: InMemoryInstanceStore::new(collection()),
        panic_on: "A",
    };
    let ctx = context(Arc::new(store), 2);
    let runner = HarnessRunner::new(RunOptions {
        families: vec![OperationFamily::Create, OperationFamily::ReIdentify],
        ..RunOptions::default()
    });

    let outcome = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap();
    let report = outcome.report;
    assert_eq!(outcome.stopped, None);
    assert_eq!(outcome.worker_panics, 0);
    assert!(!report.interrupted);
    assert_eq!(report.units.len(), 4);
    assert_eq!(report.totals.units_aborted, 1);
    assert_eq!(report.totals.units_completed, 3);
    assert_eq!(report.totals.units_skipped, 0);

    let create_a = unit(&report.units, OperationFamily::Create, "A");
    assert_eq!(create_a.assertions, 1);
    let UnitStatus::Aborted { error } = &create_a.status else {
        panic!("expected aborted unit, got {:?}", create_a.status);
    };
    assert_eq!(error.operation, StoreOperation::AddInstance);
    assert_eq!(error.type_name, "A");
    assert!(error.message.contains("backend crashed"));

    let creation = report.profile(PerformanceProfile::EntityCreation).unwrap();
    assert_eq!(creation.pass, 2);
    assert_eq!(creation.fail, 1);
    assert!(matches!(
        unit(&report.units, OperationFamily::ReIdentify, "B").status,
        UnitStatus::Completed { .. }
    ));
    assert_eq!(report.profile(PerformanceProfile::EntityReIdentify).unwrap().pass, 2);
}

#[test]
fn panic_outside_store_call_keeps_discovery_evidence() {
    let catalog = builtin_type_catalog().unwrap();
    let store = Arc::new(InMemoryInstanceStore::new(collection()));
    let create = HarnessRunner::new(RunOptions {
        families: vec![OperationFamily::Create],
        ..RunOptions::default()
    });
    let seeded = context(store.clone(), 2).with_identities(Arc::new(SequentialIdentityGenerator::new("seed")));
    assert_eq!(create.run(&seeded, &catalog, &CancellationToken::new()).unwrap().report.totals.fail, 0);

    let ctx = context(store, 2).with_identities(Arc::new(ExhaustedIdentities));
    let runner = HarnessRunner::new(RunOptions {
        families: vec![OperationFamily::ReIdentify],
        ..RunOptions::default()
    });
    let outcome = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap();
    let report = outcome.report;
    assert_eq!(outcome.stopped, None);
    assert!(!report.interrupted);
    assert!(!report.units.is_empty());
    assert_eq!(report.totals.units_aborted, report.units.len());
    for unit in &report.units {
        assert_eq!(unit.assertions, 1);
        let UnitStatus::Aborted { error } = &unit.status else {
            panic!("expected aborted unit, got {:?}", unit.status);
        };
        assert_eq!(error.phase, UnitPhase::Exercise);
        assert_eq!(error.operation, StoreOperation::ReIdentify);
        assert!(error.message.contains("identity source exhausted"));
    }
    let searches = report.profile(PerformanceProfile::EntitySearch).unwrap().pass
        + report.profile(PerformanceProfile::RelationshipSearch).unwrap().pass;
    assert_eq!(searches, report.units.len());
}

#[test]
fn failing_unit_leaves_sibling_types_completed() {
    let asset = TypeId::new("type-asset");
    let catalog = StaticTypeCatalog::new(vec![
        TypeDescriptor::entity("type-asset", "Asset"),
        TypeDescriptor::relationship("type-link", "Link", asset.clone(), asset.clone()),
        TypeDescriptor::relationship("type-flaky", "Flaky", asset.clone(), asset),
    ])
    .unwrap();
    let store = FlakyStore {
        inner: InMemoryInstanceStore::new(collection()),
        flaky_type: "Flaky",
        calls: AtomicUsize::new(0),
    };
    let ctx = context(Arc::new(store), 3);
    let runner = HarnessRunner::new(RunOptions {
        families: vec![OperationFamily::Create, OperationFamily::ReIdentify],
        ..RunOptions::default()
    });

    let outcome = runner.run(&ctx, &catalog, &CancellationToken::new()).unwrap();
    let report = outcome.report;
    assert_eq!(outcome.stopped, None);
    assert_eq!(report.totals.units_aborted, 1);
    assert_eq!(report.totals.units_completed, report.units.len() - 1);

    let flaky = unit(&report.units, OperationFamily::ReIdentify, "Flaky");
    assert_eq!(flaky.assertions, 3);
    let UnitStatus::Aborted { error } = &flaky.status else {
        panic!("expected aborted unit, got {:?}", flaky.status);
    };
    assert_eq!(error.operation, StoreOperation::ReIdentify);
    assert_eq!(error.type_id, TypeId::new("type-flaky"));
    assert_eq!(error.type_name, "Flaky");
    assert!(error.parameters.contains_key("guid"));
    assert!(error.parameters.contains_key("new_guid"));

    let link = unit(&report.units, OperationFamily::ReIdentify, "Link");
    assert!(matches!(link.status, UnitStatus::Completed { .. }));
    let re_identify = report.profile(PerformanceProfile::RelationshipReIdentify).unwrap();
    assert_eq!(re_identify.pass, 3);
    assert_eq!(re_identify.fail, 2);
    assert_eq!(report.profile(PerformanceProfile::EntityReIdentify).unwrap().pass, 3);

    let failures: Vec<_> = report
        .assertions
        .iter()
        .filter(|assertion| assertion.type_name == "Flaky" && !matches!(assertion.outcome, Outcome::Pass))
        .collect();
    assert_eq!(failures.len(), 2);
}
