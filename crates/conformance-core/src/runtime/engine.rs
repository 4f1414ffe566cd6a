// crates/conformance-core/src/runtime/engine.rs
// ============================================================================
// Module: Test Case Engine
// Description: Per-type test unit planning and the unit state machine.
// Purpose: Discover homed instances, exercise one operation family, and
//          classify every contract call into an assertion.
// Dependencies: serde, thiserror, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A run is a schedule of [`UnitPlan`]s, one per (operation family, type).
//! Each plan is executed by a [`TestUnit`] that moves through
//! `Init -> Discover -> Exercise -> Evaluate -> Done`:
//!
//! - **Discover** searches the store for instances homed in the TUT
//!   collection (or, for relationship creation, for end entities).
//! - **Exercise** issues the family's contract calls, timing each one alone.
//! - **Evaluate** turns every call into exactly one [`Assertion`].
//!
//! `NotFound`, `Conflict`, and missing results are recorded as failures and
//! the loop continues. `CapabilityUnsupported` is recorded once and stops the
//! exercise. `OperationError` is recorded and then aborts the unit with a
//! [`UnitError`] that names the operation, type, and parameters.
//!
//! A store call that panics is recorded as an `OperationError` for that call.
//! A panic anywhere else in the unit aborts it after the samples gathered so
//! far have been evaluated; sibling units are unaffected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Assertion;
use crate::core::FailureDetail;
use crate::core::Instance;
use crate::core::InstanceGuid;
use crate::core::InstanceProperties;
use crate::core::MatchCriteria;
use crate::core::OperationFamily;
use crate::core::Outcome;
use crate::core::PerformanceProfile;
use crate::core::ProfileKind;
use crate::core::PropertyValue;
use crate::core::RelationshipEnds;
use crate::core::StoreOperation;
use crate::core::TestCaseId;
use crate::core::TypeCategory;
use crate::core::TypeDescriptor;
use crate::core::TypeId;
use crate::core::duration_to_micros;
use crate::interfaces::ContractError;
use crate::interfaces::NewInstance;
use crate::interfaces::SearchRequest;
use crate::runtime::context::WorkContext;

// ============================================================================
// SECTION: Schedule
// ============================================================================

/// One (family, category) step of the run schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Operation family.
    pub family: OperationFamily,
    /// Type category.
    pub category: TypeCategory,
}

impl Phase {
    /// Returns the ordered phases for a set of families.
    ///
    /// Families run in declaration order. Entities precede relationships,
    /// except for purge where relationships go first.
    #[must_use]
    pub fn schedule(families: &[OperationFamily]) -> Vec<Self> {
        let mut selected: Vec<OperationFamily> = families.to_vec();
        selected.sort_unstable();
        selected.dedup();
        let mut phases = Vec::with_capacity(selected.len() * 2);
        for family in selected {
            let categories = if family == OperationFamily::Purge {
                [TypeCategory::Relationship, TypeCategory::Entity]
            } else {
                [TypeCategory::Entity, TypeCategory::Relationship]
            };
            for category in categories {
                phases.push(Self {
                    family,
                    category,
                });
            }
        }
        phases
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family.as_str(), self.category)
    }
}

/// One scheduled unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlan {
    /// Position in the run schedule.
    pub index: usize,
    /// Operation family.
    pub family: OperationFamily,
    /// Type under test.
    pub type_def: TypeDescriptor,
    /// Re-type target (re-type units only).
    pub target: Option<TypeDescriptor>,
    /// Test case identifier.
    pub test_case_id: TestCaseId,
}

impl UnitPlan {
    /// Returns the phase this unit belongs to.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        Phase {
            family: self.family,
            category: self.type_def.category,
        }
    }
}

/// Builds the test case identifier for a family and type.
#[must_use]
pub fn test_case_id(family: OperationFamily, type_def: &TypeDescriptor) -> TestCaseId {
    TestCaseId::new(format!(
        "repository-{}-{}-performance-{}",
        type_def.category,
        family.as_str(),
        type_def.name
    ))
}

/// Plans units for every (family, type) pair, in phase then catalog order.
///
/// Classification types produce no units. Re-type units are planned only for
/// types with a direct subtype; the first subtype in catalog order is the
/// target.
#[must_use]
pub fn plan_units(types: &[TypeDescriptor], families: &[OperationFamily]) -> Vec<UnitPlan> {
    let mut plans = Vec::new();
    for phase in Phase::schedule(families) {
        for type_def in types.iter().filter(|type_def| type_def.category == phase.category) {
            let target = if phase.family == OperationFamily::ReType {
                let subtype = types
                    .iter()
                    .find(|candidate| candidate.super_type.as_ref() == Some(&type_def.id));
                let Some(subtype) = subtype else {
                    continue;
                };
                Some(subtype.clone())
            } else {
                None
            };
            plans.push(UnitPlan {
                index: plans.len(),
                family: phase.family,
                type_def: type_def.clone(),
                target,
                test_case_id: test_case_id(phase.family, type_def),
            });
        }
    }
    plans
}

// ============================================================================
// SECTION: Unit Errors
// ============================================================================

/// States of the unit state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPhase {
    /// Constructed, not yet started.
    Init,
    /// Searching for instances to exercise.
    Discover,
    /// Issuing the family's contract calls.
    Exercise,
    /// Classifying samples into assertions.
    Evaluate,
    /// Terminal.
    Done,
}

/// Unit abort raised by an `OperationError` from the store.
///
/// # Invariants
/// - Carries enough context (operation, type, parameters) to reproduce the
///   failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{test_case_id}: {operation} on {type_name} ({type_id}) failed: {message}")]
pub struct UnitError {
    /// Test case identifier.
    pub test_case_id: TestCaseId,
    /// Unit phase in which the error was raised.
    pub phase: UnitPhase,
    /// Failing operation.
    pub operation: StoreOperation,
    /// Type identifier addressed.
    pub type_id: TypeId,
    /// Type name addressed.
    pub type_name: String,
    /// Store message.
    pub message: String,
    /// Call parameters.
    pub parameters: BTreeMap<String, String>,
}

impl UnitError {
    /// Builds the abort for a unit that panicked outside a store call.
    ///
    /// The operation is the one the unit was issuing in `phase`: search while
    /// discovering, otherwise the family's primary operation.
    pub(crate) fn panicked(plan: &UnitPlan, phase: UnitPhase, message: &str) -> Self {
        let operation = match phase {
            UnitPhase::Init | UnitPhase::Discover => StoreOperation::Search,
            UnitPhase::Exercise | UnitPhase::Evaluate | UnitPhase::Done => {
                primary_operation(plan.family)
            }
        };
        let mut parameters = BTreeMap::new();
        parameters.insert("family".to_string(), plan.family.as_str().to_string());
        parameters.insert("type_id".to_string(), plan.type_def.id.to_string());
        Self {
            test_case_id: plan.test_case_id.clone(),
            phase,
            operation,
            type_id: plan.type_def.id.clone(),
            type_name: plan.type_def.name.clone(),
            message: format!("unit panicked: {message}"),
            parameters,
        }
    }
}

/// Returns the operation a family exercises first.
const fn primary_operation(family: OperationFamily) -> StoreOperation {
    match family {
        OperationFamily::Create => StoreOperation::AddInstance,
        OperationFamily::ReIdentify => StoreOperation::ReIdentify,
        OperationFamily::ReType => StoreOperation::ReType,
        OperationFamily::DeleteRestore | OperationFamily::Purge => StoreOperation::Delete,
    }
}

/// Result of running one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    /// Assertions recorded by the unit (including before an abort).
    pub assertions: usize,
    /// Completion summary, or the abort error.
    pub result: Result<String, UnitError>,
}

// ============================================================================
// SECTION: Samples
// ============================================================================

/// Classified result of one contract call.
#[derive(Debug, Clone)]
enum CallResult {
    /// The call returned what it should.
    Produced,
    /// The call returned nothing where an instance was expected.
    Empty,
    /// The call returned a contract error.
    Failed(ContractError),
}

/// Static description of one contract call site.
#[derive(Debug, Clone)]
struct CallSite {
    /// Category of the addressed instances.
    category: TypeCategory,
    /// Profile kind the sample is bucketed under.
    kind: ProfileKind,
    /// Contract operation.
    operation: StoreOperation,
    /// Call parameters for diagnostics.
    parameters: BTreeMap<String, String>,
    /// True when `CapabilityUnsupported` must not stop the exercise.
    optional: bool,
}

/// One timed contract call awaiting evaluation.
#[derive(Debug, Clone)]
struct Sample {
    /// Unit phase that issued the call.
    phase: UnitPhase,
    /// Call site.
    site: CallSite,
    /// Classified result.
    result: CallResult,
    /// Time spent inside the contract call.
    elapsed: Duration,
}

/// Runs one store call and measures only its own duration.
///
/// A panic inside the call is returned as an `OperationError` for `operation`.
fn guarded<T>(
    operation: StoreOperation,
    call: impl FnOnce() -> Result<T, ContractError>,
) -> (Result<T, ContractError>, Duration) {
    let start = Instant::now();
    let output = panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(ContractError::operation(
            operation,
            format!("store panicked: {}", panic_message(payload.as_ref())),
        ))
    });
    (output, start.elapsed())
}

/// Extracts the message carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Returns the contract method label used in assertion identifiers.
const fn method_label(operation: StoreOperation, category: TypeCategory) -> &'static str {
    let relationship = matches!(category, TypeCategory::Relationship);
    match (operation, relationship) {
        (StoreOperation::Search, false) => "findEntitiesByProperty",
        (StoreOperation::Search, true) => "findRelationshipsByProperty",
        (StoreOperation::AddInstance, false) => "addEntity",
        (StoreOperation::AddInstance, true) => "addRelationship",
        (StoreOperation::GetInstance, false) => "getEntityDetail",
        (StoreOperation::GetInstance, true) => "getRelationship",
        (StoreOperation::ReIdentify, false) => "reIdentifyEntity",
        (StoreOperation::ReIdentify, true) => "reIdentifyRelationship",
        (StoreOperation::ReType, false) => "reTypeEntity",
        (StoreOperation::ReType, true) => "reTypeRelationship",
        (StoreOperation::Delete, false) => "deleteEntity",
        (StoreOperation::Delete, true) => "deleteRelationship",
        (StoreOperation::Restore, false) => "restoreEntity",
        (StoreOperation::Restore, true) => "restoreRelationship",
        (StoreOperation::Purge, false) => "purgeEntity",
        (StoreOperation::Purge, true) => "purgeRelationship",
    }
}

// ============================================================================
// SECTION: Test Unit
// ============================================================================

/// State machine executing one [`UnitPlan`] against the store.
pub struct TestUnit<'a> {
    /// Plan being executed.
    plan: &'a UnitPlan,
    /// Shared run context.
    ctx: &'a WorkContext,
    /// Current state.
    phase: UnitPhase,
    /// Instances selected during discovery.
    discovered: Vec<InstanceGuid>,
    /// End entities selected for relationship creation.
    end_pools: Option<(Vec<InstanceGuid>, Vec<InstanceGuid>)>,
    /// Samples awaiting evaluation.
    samples: Vec<Sample>,
    /// Set once a call stops the exercise.
    stopped: bool,
}

impl<'a> TestUnit<'a> {
    /// Creates a unit in the `Init` state.
    #[must_use]
    pub const fn new(plan: &'a UnitPlan, ctx: &'a WorkContext) -> Self {
        Self {
            plan,
            ctx,
            phase: UnitPhase::Init,
            discovered: Vec::new(),
            end_pools: None,
            samples: Vec::new(),
            stopped: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn phase(&self) -> UnitPhase {
        self.phase
    }

    /// Runs the unit to `Done`, recording assertions into the context.
    #[must_use]
    pub fn run(mut self) -> UnitOutcome {
        let exercised = panic::catch_unwind(AssertUnwindSafe(|| {
            self.phase = UnitPhase::Discover;
            self.discover();
            if !self.stopped {
                self.phase = UnitPhase::Exercise;
                self.exercise();
            }
        }));
        let reached = self.phase;
        self.phase = UnitPhase::Evaluate;
        let (assertions, mut abort) = self.evaluate();
        self.phase = UnitPhase::Done;
        if let Err(payload) = exercised
            && abort.is_none()
        {
            abort = Some(UnitError::panicked(self.plan, reached, &panic_message(payload.as_ref())));
        }
        let result = abort.map_or_else(|| Ok(self.summary()), Err);
        UnitOutcome {
            assertions,
            result,
        }
    }

    // ------------------------------------------------------------------------
    // Discover
    // ------------------------------------------------------------------------

    /// Selects the instances (or end entities) the exercise will use.
    fn discover(&mut self) {
        let plan = self.plan;
        let type_def = &plan.type_def;
        match (plan.family, type_def.category) {
            (OperationFamily::Create, TypeCategory::Relationship) => {
                let Some(ends) = &type_def.ends else {
                    return;
                };
                let end_one = self.search_homed(TypeCategory::Entity, &ends.end_one);
                if self.stopped {
                    return;
                }
                let end_two = self.search_homed(TypeCategory::Entity, &ends.end_two);
                if !self.stopped {
                    self.end_pools = Some((end_one, end_two));
                }
            }
            (OperationFamily::Create, _) => {}
            (_, category) => {
                self.discovered = self.search_homed(category, &type_def.id);
            }
        }
    }

    /// Searches up to N active instances of `type_id` homed in the TUT collection.
    fn search_homed(&mut self, category: TypeCategory, type_id: &TypeId) -> Vec<InstanceGuid> {
        let ctx = self.ctx;
        let request = SearchRequest::first_page(
            type_id.clone(),
            InstanceProperties::collection_filter(&ctx.tut().collection_id),
            MatchCriteria::All,
            ctx.instances_per_type(),
        );
        let site = self.site(category, ProfileKind::Search, StoreOperation::Search, type_id);
        let (result, elapsed) = guarded(StoreOperation::Search, || {
            ctx.store().search(ctx.user_id(), &request)
        });
        match result {
            Ok(instances) => {
                self.push(site, CallResult::Produced, elapsed);
                let homed = &ctx.tut().collection_id;
                instances
                    .into_iter()
                    .filter(|instance| instance.header.collection_id == *homed)
                    .take(ctx.instances_per_type())
                    .map(|instance| instance.header.guid)
                    .collect()
            }
            Err(err) => {
                self.push(site, CallResult::Failed(err), elapsed);
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Exercise
    // ------------------------------------------------------------------------

    /// Issues the family's contract calls.
    fn exercise(&mut self) {
        match self.plan.family {
            OperationFamily::Create => self.exercise_create(),
            OperationFamily::ReIdentify => self.exercise_re_identify(),
            OperationFamily::ReType => self.exercise_re_type(),
            OperationFamily::DeleteRestore => self.exercise_delete_restore(),
            OperationFamily::Purge => self.exercise_purge(),
        }
    }

    /// Creates N instances of the type.
    fn exercise_create(&mut self) {
        let ctx = self.ctx;
        let plan = self.plan;
        let type_def = &plan.type_def;
        let category = type_def.category;
        let pools = self.end_pools.take();
        if category == TypeCategory::Relationship
            && pools.as_ref().is_none_or(|(one, two)| one.is_empty() || two.is_empty())
        {
            return;
        }
        for index in 0..ctx.instances_per_type() {
            let ends = pools.as_ref().and_then(|(one, two)| {
                let end_one = one.get(index % one.len())?;
                let end_two = two.get(index % two.len())?;
                Some(RelationshipEnds {
                    end_one: end_one.clone(),
                    end_two: end_two.clone(),
                })
            });
            let suffix = ctx.identities().next_identity();
            let request = NewInstance {
                type_def: type_def.clone(),
                properties: InstanceProperties::new()
                    .with_property("qualifiedName", format!("{}-{suffix}", type_def.name))
                    .with_property(
                        "performanceIndex",
                        PropertyValue::Int(i64::try_from(index).unwrap_or(i64::MAX)),
                    ),
                ends,
            };
            let mut site =
                self.site(category, ProfileKind::Creation, StoreOperation::AddInstance, &type_def.id);
            if let Some(ends) = &request.ends {
                site.parameters.insert("end_one".to_string(), ends.end_one.to_string());
                site.parameters.insert("end_two".to_string(), ends.end_two.to_string());
            }
            let (result, elapsed) = guarded(StoreOperation::AddInstance, || {
                ctx.store().add_instance(ctx.user_id(), &request)
            });
            self.record_instance_call(site, result, elapsed);
            if self.stopped {
                return;
            }
        }
    }

    /// Re-identifies each discovered instance with a fresh identity.
    fn exercise_re_identify(&mut self) {
        let ctx = self.ctx;
        let plan = self.plan;
        let type_def = &plan.type_def;
        for guid in std::mem::take(&mut self.discovered) {
            let new_guid = ctx.identities().next_identity();
            let mut site = self.instance_site(ProfileKind::ReIdentify, StoreOperation::ReIdentify, &guid);
            site.parameters.insert("new_guid".to_string(), new_guid.to_string());
            let (result, elapsed) = guarded(StoreOperation::ReIdentify, || {
                ctx.store().re_identify(ctx.user_id(), type_def, &guid, &new_guid)
            });
            self.record_instance_call(site, result, elapsed);
            if self.stopped {
                return;
            }
        }
    }

    /// Re-types each discovered instance to the planned subtype.
    fn exercise_re_type(&mut self) {
        let ctx = self.ctx;
        let plan = self.plan;
        let type_def = &plan.type_def;
        let Some(target) = &plan.target else {
            return;
        };
        for guid in std::mem::take(&mut self.discovered) {
            let mut site = self.instance_site(ProfileKind::ReType, StoreOperation::ReType, &guid);
            site.parameters.insert("target_type_id".to_string(), target.id.to_string());
            site.parameters.insert("target_type_name".to_string(), target.name.clone());
            let (result, elapsed) = guarded(StoreOperation::ReType, || {
                ctx.store().re_type(ctx.user_id(), &guid, type_def, target)
            });
            self.record_instance_call(site, result, elapsed);
            if self.stopped {
                return;
            }
        }
    }

    /// Soft-deletes then restores each discovered instance.
    fn exercise_delete_restore(&mut self) {
        let ctx = self.ctx;
        let plan = self.plan;
        let type_def = &plan.type_def;
        for guid in std::mem::take(&mut self.discovered) {
            let site = self.instance_site(ProfileKind::Delete, StoreOperation::Delete, &guid);
            let (result, elapsed) = guarded(StoreOperation::Delete, || {
                ctx.store().delete(ctx.user_id(), type_def, &guid)
            });
            let deleted = self.record_instance_call(site, result, elapsed);
            if self.stopped {
                return;
            }
            if deleted.is_none() {
                continue;
            }
            let site = self.instance_site(ProfileKind::Restore, StoreOperation::Restore, &guid);
            let (result, elapsed) = guarded(StoreOperation::Restore, || {
                ctx.store().restore(ctx.user_id(), type_def, &guid)
            });
            self.record_instance_call(site, result, elapsed);
            if self.stopped {
                return;
            }
        }
    }

    /// Soft-deletes (when supported) then purges each discovered instance.
    fn exercise_purge(&mut self) {
        let ctx = self.ctx;
        let plan = self.plan;
        let type_def = &plan.type_def;
        let mut soft_delete = true;
        for guid in std::mem::take(&mut self.discovered) {
            if soft_delete {
                let mut site = self.instance_site(ProfileKind::Delete, StoreOperation::Delete, &guid);
                site.optional = true;
                let (result, elapsed) = guarded(StoreOperation::Delete, || {
                    ctx.store().delete(ctx.user_id(), type_def, &guid)
                });
                if matches!(result, Err(ContractError::CapabilityUnsupported { .. })) {
                    soft_delete = false;
                }
                let deleted = self.record_instance_call(site, result, elapsed);
                if self.stopped {
                    return;
                }
                if soft_delete && deleted.is_none() {
                    continue;
                }
            }
            let site = self.instance_site(ProfileKind::Purge, StoreOperation::Purge, &guid);
            let (result, elapsed) = guarded(StoreOperation::Purge, || {
                ctx.store().purge(ctx.user_id(), type_def, &guid)
            });
            let result = match result {
                Ok(()) => CallResult::Produced,
                Err(err) => CallResult::Failed(err),
            };
            self.push(site, result, elapsed);
            if self.stopped {
                return;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Sample recording
    // ------------------------------------------------------------------------

    /// Builds a call site for an operation on a type.
    fn site(
        &self,
        category: TypeCategory,
        kind: ProfileKind,
        operation: StoreOperation,
        type_id: &TypeId,
    ) -> CallSite {
        let mut parameters = BTreeMap::new();
        parameters.insert("type_id".to_string(), type_id.to_string());
        parameters.insert("user_id".to_string(), self.ctx.user_id().to_string());
        CallSite {
            category,
            kind,
            operation,
            parameters,
            optional: false,
        }
    }

    /// Builds a call site addressing one instance of the unit's type.
    fn instance_site(
        &self,
        kind: ProfileKind,
        operation: StoreOperation,
        guid: &InstanceGuid,
    ) -> CallSite {
        let type_def = &self.plan.type_def;
        let mut site = self.site(type_def.category, kind, operation, &type_def.id);
        site.parameters.insert("guid".to_string(), guid.to_string());
        site
    }

    /// Records an instance-returning call; returns the instance when produced.
    fn record_instance_call(
        &mut self,
        site: CallSite,
        result: Result<Option<Instance>, ContractError>,
        elapsed: Duration,
    ) -> Option<Instance> {
        let (classified, instance) = match result {
            Ok(Some(instance)) => (CallResult::Produced, Some(instance)),
            Ok(None) => (CallResult::Empty, None),
            Err(err) => (CallResult::Failed(err), None),
        };
        self.push(site, classified, elapsed);
        instance
    }

    /// Appends a sample and applies the stop rules.
    fn push(&mut self, site: CallSite, result: CallResult, elapsed: Duration) {
        match &result {
            CallResult::Failed(ContractError::OperationError {
                ..
            }) => self.stopped = true,
            CallResult::Failed(ContractError::CapabilityUnsupported {
                ..
            }) if !site.optional => self.stopped = true,
            _ => {}
        }
        self.samples.push(Sample {
            phase: self.phase,
            site,
            result,
            elapsed,
        });
    }

    // ------------------------------------------------------------------------
    // Evaluate
    // ------------------------------------------------------------------------

    /// Converts samples into assertions; returns the count and any abort.
    fn evaluate(&mut self) -> (usize, Option<UnitError>) {
        let plan = self.plan;
        let type_name = &plan.type_def.name;
        let mut recorded = 0usize;
        let mut abort = None;
        for (sequence, sample) in std::mem::take(&mut self.samples).into_iter().enumerate() {
            // Classification plans are never scheduled.
            let Some(profile) = PerformanceProfile::from_parts(sample.site.category, sample.site.kind)
            else {
                continue;
            };
            let detail = |message: String| FailureDetail {
                operation: sample.site.operation,
                type_id: plan.type_def.id.clone(),
                type_name: type_name.clone(),
                message,
                parameters: sample.site.parameters.clone(),
            };
            let (outcome, elapsed_us) = match &sample.result {
                CallResult::Produced => (Outcome::Pass, Some(duration_to_micros(sample.elapsed))),
                CallResult::Empty => (
                    Outcome::Fail(detail(format!(
                        "{} returned no instance",
                        sample.site.operation
                    ))),
                    Some(duration_to_micros(sample.elapsed)),
                ),
                CallResult::Failed(ContractError::CapabilityUnsupported {
                    ..
                }) => (Outcome::Unsupported, None),
                CallResult::Failed(err) => {
                    if let ContractError::OperationError {
                        message, ..
                    } = err
                        && abort.is_none()
                    {
                        abort = Some(UnitError {
                            test_case_id: plan.test_case_id.clone(),
                            phase: sample.phase,
                            operation: sample.site.operation,
                            type_id: plan.type_def.id.clone(),
                            type_name: type_name.clone(),
                            message: message.clone(),
                            parameters: sample.site.parameters.clone(),
                        });
                    }
                    (Outcome::Fail(detail(err.to_string())), Some(duration_to_micros(sample.elapsed)))
                }
            };
            self.ctx.results().record(Assertion {
                assertion_id: format!(
                    "{}-{}",
                    plan.test_case_id,
                    method_label(sample.site.operation, sample.site.category)
                ),
                test_case_id: plan.test_case_id.clone(),
                unit_index: plan.index,
                sequence: u32::try_from(sequence).unwrap_or(u32::MAX),
                type_name: type_name.clone(),
                profile,
                operation: sample.site.operation,
                description: format!("{} Type under test: {type_name}.", profile.description()),
                outcome,
                elapsed_us,
            });
            recorded += 1;
        }
        (recorded, abort)
    }

    /// Builds the completion summary.
    fn summary(&self) -> String {
        format!(
            "{} {} performance tests complete for: {}",
            self.plan.type_def.category,
            self.plan.family.as_str(),
            self.plan.type_def.name
        )
    }
}
