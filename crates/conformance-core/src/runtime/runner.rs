// crates/conformance-core/src/runtime/runner.rs
// ============================================================================
// Module: Harness Runner
// Description: Phase scheduling over a bounded worker pool.
// Purpose: Execute every planned unit with timeout and cancellation support.
// Dependencies: serde, thiserror, crate::runtime
// ============================================================================

//! ## Overview
//! [`HarnessRunner`] plans units from the type catalog and executes them phase
//! by phase. Units inside a phase share a queue drained by up to `workers`
//! scoped threads; a phase finishes before the next begins so that, for
//! example, all entity creation completes before relationship creation
//! searches for end entities.
//!
//! Cancellation and the run deadline are checked before each unit starts.
//! In-flight units always run to completion so their evidence is kept; units
//! still queued are recorded as skipped.
//!
//! A unit that panics is recorded as aborted and its worker moves on to the
//! next queued unit. Panics never stop the run.
//!
//! Stores that do not declare concurrent mutation support run mutating phases
//! with a single worker unless [`SerializePolicy::Never`] is chosen.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::OperationFamily;
use crate::interfaces::CatalogError;
use crate::interfaces::InstanceStore;
use crate::interfaces::TypeCatalog;
use crate::runtime::aggregator::ConformanceReport;
use crate::runtime::aggregator::ReportError;
use crate::runtime::aggregator::ReportMetadata;
use crate::runtime::aggregator::UnitRecord;
use crate::runtime::aggregator::UnitStatus;
use crate::runtime::context::WorkContext;
use crate::runtime::engine::Phase;
use crate::runtime::engine::TestUnit;
use crate::runtime::engine::UnitError;
use crate::runtime::engine::UnitOutcome;
use crate::runtime::engine::UnitPhase;
use crate::runtime::engine::UnitPlan;
use crate::runtime::engine::panic_message;
use crate::runtime::engine::plan_units;
use crate::runtime::events::HarnessEvent;
use crate::runtime::events::HarnessEventKind;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Default worker count.
pub const DEFAULT_WORKERS: usize = 4;

/// Policy for serializing mutating phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializePolicy {
    /// Serialize when the store does not declare concurrent mutation support.
    #[default]
    Auto,
    /// Always run one unit at a time.
    Always,
    /// Always use the full worker pool.
    Never,
}

/// Runner options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum concurrent units.
    pub workers: usize,
    /// Overall run deadline.
    pub timeout: Option<Duration>,
    /// Families to execute.
    pub families: Vec<OperationFamily>,
    /// Serialization policy for mutating phases.
    pub serialize: SerializePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: None,
            families: OperationFamily::ALL.to_vec(),
            serialize: SerializePolicy::Auto,
        }
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Set once cancellation is requested.
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why a run stopped before finishing its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The caller cancelled the run.
    Cancelled,
    /// The run deadline elapsed.
    TimedOut,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("run cancelled before unit started"),
            Self::TimedOut => f.write_str("run timeout elapsed before unit started"),
        }
    }
}

/// Stop conditions checked before each unit starts.
#[derive(Debug, Clone, Copy)]
struct StopCheck<'a> {
    /// Caller cancellation.
    cancel: &'a CancellationToken,
    /// Run deadline.
    deadline: Option<Instant>,
}

impl StopCheck<'_> {
    /// Returns the stop reason, if any.
    fn reason(&self) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StopReason::TimedOut),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runner errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The type catalog could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The report could not be built.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Result of a completed (or interrupted) run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Conformance report.
    pub report: ConformanceReport,
    /// Why the run stopped early, if it did.
    pub stopped: Option<StopReason>,
    /// Units whose execution panicked outside the engine's own recovery.
    pub worker_panics: usize,
}

/// Phase-ordered unit executor.
#[derive(Debug, Clone, Default)]
pub struct HarnessRunner {
    /// Runner options.
    options: RunOptions,
}

impl HarnessRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new(options: RunOptions) -> Self {
        Self {
            options,
        }
    }

    /// Returns the runner options.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Returns the worker width used for mutating phases against `store`.
    #[must_use]
    pub fn effective_width(&self, store: &dyn InstanceStore) -> usize {
        let workers = self.options.workers.max(1);
        match self.options.serialize {
            SerializePolicy::Always => 1,
            SerializePolicy::Never => workers,
            SerializePolicy::Auto if store.supports_concurrent_mutation() => workers,
            SerializePolicy::Auto => 1,
        }
    }

    /// Plans and executes every unit, then builds the report.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the catalog cannot be read or the report
    /// cannot be built. Unit failures are evidence, not errors.
    pub fn run(
        &self,
        ctx: &WorkContext,
        catalog: &dyn TypeCatalog,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunnerError> {
        let types = catalog.types()?;
        let plans = plan_units(&types, &self.options.families);
        let width = self.effective_width(ctx.store());
        let check = StopCheck {
            cancel,
            deadline: self.options.timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
        };
        ctx.events().record(&HarnessEvent::now(HarnessEventKind::RunStarted {
            server_name: ctx.tut().server_name.clone(),
            collection_id: ctx.tut().collection_id.clone(),
            units: plans.len(),
            width,
        }));

        let mut stopped = None;
        let mut worker_panics = 0usize;
        for phase in Phase::schedule(&self.options.families) {
            let units: Vec<&UnitPlan> = plans.iter().filter(|plan| plan.phase() == phase).collect();
            if units.is_empty() {
                continue;
            }
            if stopped.is_none() {
                stopped = check.reason();
            }
            if let Some(reason) = stopped {
                for plan in units {
                    record_skipped(ctx, plan, &reason.to_string());
                }
                continue;
            }
            ctx.events().record(&HarnessEvent::now(HarnessEventKind::PhaseStarted {
                family: phase.family,
                category: phase.category,
                units: units.len(),
            }));
            let (leftover, panics) = run_phase(ctx, &units, width, check);
            worker_panics += panics;
            if !leftover.is_empty() {
                let reason = check.reason();
                if reason.is_some() {
                    stopped = reason;
                }
                let label = reason.map_or_else(
                    || "worker exited before unit started".to_string(),
                    |reason| reason.to_string(),
                );
                for plan in leftover {
                    record_skipped(ctx, plan, &label);
                }
            }
        }

        let report = ctx.results().report(
            ReportMetadata {
                server_name: ctx.tut().server_name.clone(),
                collection_id: ctx.tut().collection_id.clone(),
                user_id: ctx.user_id().clone(),
                instances_per_type: ctx.instances_per_type(),
            },
            stopped.is_some(),
        )?;
        ctx.events().record(&HarnessEvent::now(HarnessEventKind::RunFinished {
            assertions: report.totals.assertions,
            interrupted: stopped.is_some(),
        }));
        Ok(RunOutcome {
            report,
            stopped,
            worker_panics,
        })
    }
}

// ============================================================================
// SECTION: Workers
// ============================================================================

/// Drains one phase's queue; returns units never started and panic count.
fn run_phase<'p>(
    ctx: &WorkContext,
    units: &[&'p UnitPlan],
    width: usize,
    check: StopCheck<'_>,
) -> (Vec<&'p UnitPlan>, usize) {
    let queue: Mutex<VecDeque<&'p UnitPlan>> = Mutex::new(units.iter().copied().collect());
    let workers = width.clamp(1, units.len().max(1));
    let panics = thread::scope(|scope| {
        let handles: Vec<_> =
            (0..workers).map(|_| scope.spawn(|| drain_queue(ctx, &queue, check))).collect();
        handles.into_iter().map(|handle| handle.join().unwrap_or(1)).sum()
    });
    let leftover = queue.into_inner().unwrap_or_else(PoisonError::into_inner).into_iter().collect();
    (leftover, panics)
}

/// Worker loop: start units until the queue empties or the run stops.
///
/// Returns the number of units that panicked on this worker.
fn drain_queue(
    ctx: &WorkContext,
    queue: &Mutex<VecDeque<&UnitPlan>>,
    check: StopCheck<'_>,
) -> usize {
    let mut panics = 0;
    loop {
        if check.reason().is_some() {
            return panics;
        }
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let Some(plan) = next else {
            return panics;
        };
        if execute_unit(ctx, plan) {
            panics += 1;
        }
    }
}

/// Runs one unit and records its terminal status; returns true on panic.
fn execute_unit(ctx: &WorkContext, plan: &UnitPlan) -> bool {
    ctx.events().record(&HarnessEvent::now(HarnessEventKind::UnitStarted {
        test_case_id: plan.test_case_id.clone(),
    }));
    let run = panic::catch_unwind(AssertUnwindSafe(|| TestUnit::new(plan, ctx).run()));
    let panicked = run.is_err();
    let outcome = run.unwrap_or_else(|payload| UnitOutcome {
        assertions: ctx.results().unit_assertion_count(plan.index),
        result: Err(UnitError::panicked(
            plan,
            UnitPhase::Evaluate,
            &panic_message(payload.as_ref()),
        )),
    });
    let status = match outcome.result {
        Ok(summary) => {
            ctx.events().record(&HarnessEvent::now(HarnessEventKind::UnitFinished {
                test_case_id: plan.test_case_id.clone(),
                assertions: outcome.assertions,
                summary: summary.clone(),
            }));
            UnitStatus::Completed {
                summary,
            }
        }
        Err(error) => {
            ctx.events().record(&HarnessEvent::now(HarnessEventKind::UnitAborted {
                test_case_id: plan.test_case_id.clone(),
                error: error.to_string(),
            }));
            UnitStatus::Aborted {
                error,
            }
        }
    };
    ctx.results().record_unit(unit_record(plan, outcome.assertions, status));
    panicked
}

/// Records a unit that never started.
fn record_skipped(ctx: &WorkContext, plan: &UnitPlan, reason: &str) {
    ctx.events().record(&HarnessEvent::now(HarnessEventKind::UnitSkipped {
        test_case_id: plan.test_case_id.clone(),
        reason: reason.to_string(),
    }));
    ctx.results().record_unit(unit_record(
        plan,
        0,
        UnitStatus::Skipped {
            reason: reason.to_string(),
        },
    ));
}

/// Builds a unit record.
fn unit_record(plan: &UnitPlan, assertions: usize, status: UnitStatus) -> UnitRecord {
    UnitRecord {
        unit_index: plan.index,
        test_case_id: plan.test_case_id.clone(),
        type_name: plan.type_def.name.clone(),
        family: plan.family,
        category: plan.type_def.category,
        assertions,
        status,
    }
}
