// crates/conformance-core/src/runtime/aggregator.rs
// ============================================================================
// Module: Result Aggregator
// Description: Thread-safe evidence collection and report summarization.
// Purpose: Bucket assertions by performance profile and build run reports.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! [`ResultAggregator`] accepts assertions and unit records from concurrent
//! workers. Nothing recorded is ever dropped: a poisoned lock is recovered
//! rather than discarding evidence. [`ResultAggregator::report`] produces a
//! [`ConformanceReport`] with every profile listed (empty profiles included),
//! assertions ordered by unit schedule position, and an outcome digest that is
//! stable across runs with identical outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Assertion;
use crate::core::HashDigest;
use crate::core::HashError;
use crate::core::MetadataCollectionId;
use crate::core::OperationFamily;
use crate::core::Outcome;
use crate::core::PerformanceProfile;
use crate::core::StoreOperation;
use crate::core::TestCaseId;
use crate::core::TypeCategory;
use crate::core::UserId;
use crate::core::hashing::hash_canonical_json;
use crate::runtime::engine::UnitError;

// ============================================================================
// SECTION: Unit Records
// ============================================================================

/// Terminal status of one scheduled unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    /// The unit ran to completion.
    Completed {
        /// Completion summary.
        summary: String,
    },
    /// The unit stopped on an operation error.
    Aborted {
        /// Abort diagnostics.
        error: UnitError,
    },
    /// The unit was never started.
    Skipped {
        /// Skip reason.
        reason: String,
    },
}

/// Record of one scheduled unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Position in the run schedule.
    pub unit_index: usize,
    /// Test case identifier.
    pub test_case_id: TestCaseId,
    /// Type under test.
    pub type_name: String,
    /// Operation family.
    pub family: OperationFamily,
    /// Type category.
    pub category: TypeCategory,
    /// Assertions recorded by the unit.
    pub assertions: usize,
    /// Terminal status.
    pub status: UnitStatus,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Run-level metadata copied into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Server name of the technology under test.
    pub server_name: String,
    /// Collection the harness mutated.
    pub collection_id: MetadataCollectionId,
    /// Caller identity.
    pub user_id: UserId,
    /// Instances exercised per type.
    pub instances_per_type: usize,
}

/// Summary statistics for one performance profile.
///
/// # Invariants
/// - `pass + fail + unsupported == total`.
/// - Timing fields are `None` exactly when `samples == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Profile identifier.
    pub profile: PerformanceProfile,
    /// Profile description.
    pub description: String,
    /// Assertions bucketed under the profile.
    pub total: usize,
    /// Passing assertions.
    pub pass: usize,
    /// Failing assertions.
    pub fail: usize,
    /// Unsupported assertions.
    pub unsupported: usize,
    /// Timed samples (pass and fail).
    pub samples: usize,
    /// Fastest sample in microseconds.
    pub min_us: Option<u64>,
    /// Slowest sample in microseconds.
    pub max_us: Option<u64>,
    /// Mean sample in microseconds.
    pub mean_us: Option<u64>,
    /// Median sample in microseconds.
    pub p50_us: Option<u64>,
    /// 95th percentile sample in microseconds.
    pub p95_us: Option<u64>,
}

/// Run-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportTotals {
    /// Assertions recorded.
    pub assertions: usize,
    /// Passing assertions.
    pub pass: usize,
    /// Failing assertions.
    pub fail: usize,
    /// Unsupported assertions.
    pub unsupported: usize,
    /// Units that completed.
    pub units_completed: usize,
    /// Units that aborted.
    pub units_aborted: usize,
    /// Units that never started.
    pub units_skipped: usize,
}

/// Complete conformance report for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Run metadata.
    pub metadata: ReportMetadata,
    /// RFC 3339 generation time, when stamped by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// True when the run stopped on cancellation or timeout.
    pub interrupted: bool,
    /// Run-wide counters.
    pub totals: ReportTotals,
    /// Per-profile summaries in profile order.
    pub profiles: Vec<ProfileSummary>,
    /// Unit records in schedule order.
    pub units: Vec<UnitRecord>,
    /// Assertions ordered by unit index and sequence.
    pub assertions: Vec<Assertion>,
    /// Digest over assertion identities and outcome labels.
    pub outcome_digest: HashDigest,
}

impl ConformanceReport {
    /// Returns the summary for one profile.
    #[must_use]
    pub fn profile(&self, profile: PerformanceProfile) -> Option<&ProfileSummary> {
        self.profiles.iter().find(|summary| summary.profile == profile)
    }
}

/// Errors raised while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Outcome digest computation failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Mutable aggregator state.
#[derive(Debug, Default)]
struct AggregatorState {
    /// Recorded assertions in arrival order.
    assertions: Vec<Assertion>,
    /// Recorded unit records in arrival order.
    units: Vec<UnitRecord>,
}

/// Thread-safe evidence sink shared by all workers.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    /// Guarded state.
    state: Mutex<AggregatorState>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one assertion.
    pub fn record(&self, assertion: Assertion) {
        self.lock().assertions.push(assertion);
    }

    /// Records one unit record.
    pub fn record_unit(&self, unit: UnitRecord) {
        self.lock().units.push(unit);
    }

    /// Returns the number of assertions recorded so far.
    #[must_use]
    pub fn assertion_count(&self) -> usize {
        self.lock().assertions.len()
    }

    /// Returns the number of assertions recorded for one unit.
    #[must_use]
    pub fn unit_assertion_count(&self, unit_index: usize) -> usize {
        self.lock().assertions.iter().filter(|assertion| assertion.unit_index == unit_index).count()
    }

    /// Returns recorded assertions ordered by unit index and sequence.
    #[must_use]
    pub fn assertions(&self) -> Vec<Assertion> {
        let mut assertions = self.lock().assertions.clone();
        assertions.sort_by_key(|assertion| (assertion.unit_index, assertion.sequence));
        assertions
    }

    /// Builds the run report from everything recorded so far.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the outcome digest cannot be computed.
    pub fn report(
        &self,
        metadata: ReportMetadata,
        interrupted: bool,
    ) -> Result<ConformanceReport, ReportError> {
        let assertions = self.assertions();
        let mut units = self.lock().units.clone();
        units.sort_by_key(|unit| unit.unit_index);

        let mut totals = ReportTotals {
            assertions: assertions.len(),
            ..ReportTotals::default()
        };
        for assertion in &assertions {
            match assertion.outcome {
                Outcome::Pass => totals.pass += 1,
                Outcome::Fail(_) => totals.fail += 1,
                Outcome::Unsupported => totals.unsupported += 1,
            }
        }
        for unit in &units {
            match unit.status {
                UnitStatus::Completed {
                    ..
                } => totals.units_completed += 1,
                UnitStatus::Aborted {
                    ..
                } => totals.units_aborted += 1,
                UnitStatus::Skipped {
                    ..
                } => totals.units_skipped += 1,
            }
        }

        let profiles = PerformanceProfile::ALL
            .iter()
            .map(|profile| summarize_profile(*profile, &assertions))
            .collect();
        let outcome_digest = outcome_digest(&assertions)?;
        Ok(ConformanceReport {
            metadata,
            generated_at: None,
            interrupted,
            totals,
            profiles,
            units,
            assertions,
            outcome_digest,
        })
    }

    /// Locks state, recovering from poisoning so evidence is never lost.
    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Summarizes the assertions bucketed under one profile.
fn summarize_profile(profile: PerformanceProfile, assertions: &[Assertion]) -> ProfileSummary {
    let mut summary = ProfileSummary {
        profile,
        description: profile.description().to_string(),
        total: 0,
        pass: 0,
        fail: 0,
        unsupported: 0,
        samples: 0,
        min_us: None,
        max_us: None,
        mean_us: None,
        p50_us: None,
        p95_us: None,
    };
    let mut samples = Vec::new();
    for assertion in assertions.iter().filter(|assertion| assertion.profile == profile) {
        summary.total += 1;
        match assertion.outcome {
            Outcome::Pass => summary.pass += 1,
            Outcome::Fail(_) => summary.fail += 1,
            Outcome::Unsupported => summary.unsupported += 1,
        }
        if let Some(elapsed) = assertion.elapsed_us {
            samples.push(elapsed);
        }
    }
    if samples.is_empty() {
        return summary;
    }
    samples.sort_unstable();
    let total: u128 = samples.iter().map(|sample| u128::from(*sample)).sum();
    let count = samples.len();
    summary.samples = count;
    summary.min_us = samples.first().copied();
    summary.max_us = samples.last().copied();
    summary.mean_us = u128::try_from(count)
        .ok()
        .and_then(|count| u64::try_from(total / count).ok());
    summary.p50_us = percentile(&samples, 50);
    summary.p95_us = percentile(&samples, 95);
    summary
}

/// Nearest-rank percentile over sorted samples; `None` when empty or out of range.
#[must_use]
pub fn percentile(sorted: &[u64], percentile: u32) -> Option<u64> {
    if sorted.is_empty() || percentile == 0 || percentile > 100 {
        return None;
    }
    let len = u128::try_from(sorted.len()).ok()?;
    let rank = len.saturating_mul(u128::from(percentile)).saturating_add(99) / 100;
    let index = usize::try_from(rank.max(1) - 1).ok()?;
    sorted.get(index.min(sorted.len() - 1)).copied()
}

// ============================================================================
// SECTION: Outcome Digest
// ============================================================================

/// Timing-free projection of one assertion used for the outcome digest.
#[derive(Serialize)]
struct DigestEntry<'a> {
    /// Assertion identifier.
    assertion_id: &'a str,
    /// Type under test.
    type_name: &'a str,
    /// Profile bucket.
    profile: PerformanceProfile,
    /// Contract operation.
    operation: StoreOperation,
    /// Outcome label.
    outcome: &'static str,
}

/// Hashes ordered assertion identities and outcome labels.
fn outcome_digest(assertions: &[Assertion]) -> Result<HashDigest, HashError> {
    let entries: Vec<DigestEntry<'_>> = assertions
        .iter()
        .map(|assertion| DigestEntry {
            assertion_id: &assertion.assertion_id,
            type_name: &assertion.type_name,
            profile: assertion.profile,
            operation: assertion.operation,
            outcome: assertion.outcome.as_str(),
        })
        .collect();
    hash_canonical_json(&entries)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
