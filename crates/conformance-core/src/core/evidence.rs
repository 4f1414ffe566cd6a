// crates/conformance-core/src/core/evidence.rs
// ============================================================================
// Module: Conformance Evidence
// Description: Assertion records and classified outcomes for executed checks.
// Purpose: Capture one immutable record per contract call made by the harness.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every check executed by a test unit becomes exactly one [`Assertion`].
//! Outcomes are a tagged [`Outcome`] so that "capability not supported" is a
//! first-class result that is never conflated with failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TestCaseId;
use crate::core::identifiers::TypeId;
use crate::core::profile::PerformanceProfile;
use crate::core::profile::StoreOperation;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Diagnostic context attached to a failed check.
///
/// # Invariants
/// - `parameters` holds the inputs that produced the failure (identities,
///   type identifiers) in name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Contract operation that failed.
    pub operation: StoreOperation,
    /// Type identifier the operation addressed.
    pub type_id: TypeId,
    /// Type name the operation addressed.
    pub type_name: String,
    /// Failure message.
    pub message: String,
    /// Operation parameters.
    pub parameters: BTreeMap<String, String>,
}

/// Classified outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The check met its expectation.
    Pass,
    /// The check did not meet its expectation.
    Fail(FailureDetail),
    /// The TUT does not implement the optional operation.
    Unsupported,
}

impl Outcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail(_) => "fail",
            Self::Unsupported => "unsupported",
        }
    }
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Immutable record of one executed check.
///
/// # Invariants
/// - `elapsed_us` is `None` exactly when `outcome` is [`Outcome::Unsupported`].
/// - (`unit_index`, `sequence`) is unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Assertion identifier (test case id plus operation suffix).
    pub assertion_id: String,
    /// Owning test case.
    pub test_case_id: TestCaseId,
    /// Position of the owning unit in the run schedule.
    pub unit_index: usize,
    /// Position of this assertion within its unit.
    pub sequence: u32,
    /// Name of the type under test.
    pub type_name: String,
    /// Profile the evidence is bucketed under.
    pub profile: PerformanceProfile,
    /// Contract operation exercised.
    pub operation: StoreOperation,
    /// Human-readable description of the check.
    pub description: String,
    /// Classified outcome.
    pub outcome: Outcome,
    /// Elapsed time of the contract call in microseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_us: Option<u64>,
}

/// Converts a measured duration to whole microseconds, saturating on overflow.
#[must_use]
pub fn duration_to_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}
