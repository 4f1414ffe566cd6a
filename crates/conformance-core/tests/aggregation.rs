// crates/conformance-core/tests/aggregation.rs
// ============================================================================
// Module: Result Aggregation Tests
// Description: Property-based completeness checks for report summaries.
// Purpose: Ensure every recorded assertion is counted exactly once.
// Dependencies: conformance-core, proptest
// ============================================================================
//! ## Overview
//! Generates arbitrary assertion sets and checks the aggregator's per-profile
//! and run-wide counters, including concurrent recording.

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

use std::collections::BTreeMap;
use std::thread;

use conformance_core::Assertion;
use conformance_core::FailureDetail;
use conformance_core::MetadataCollectionId;
use conformance_core::Outcome;
use conformance_core::PerformanceProfile;
use conformance_core::StoreOperation;
use conformance_core::TestCaseId;
use conformance_core::TypeId;
use conformance_core::UserId;
use conformance_core::runtime::ReportMetadata;
use conformance_core::runtime::ResultAggregator;
use proptest::prelude::*;

fn metadata() -> ReportMetadata {
    ReportMetadata {
        server_name: "tut".to_string(),
        collection_id: MetadataCollectionId::new("c"),
        user_id: UserId::new("u"),
        instances_per_type: 1,
    }
}

fn assertion(unit_index: usize, sequence: u32, profile: PerformanceProfile, outcome: u8, elapsed: u64) -> Assertion {
    let outcome = match outcome {
        0 => Outcome::Pass,
        1 => Outcome::Fail(FailureDetail {
            operation: StoreOperation::Search,
            type_id: TypeId::new("t"),
            type_name: "T".to_string(),
            message: "mismatch".to_string(),
            parameters: BTreeMap::new(),
        }),
        _ => Outcome::Unsupported,
    };
    let elapsed_us = if matches!(outcome, Outcome::Unsupported) { None } else { Some(elapsed) };
    Assertion {
        assertion_id: format!("case-{unit_index}"),
        test_case_id: TestCaseId::new(format!("case-{unit_index}")),
        unit_index,
        sequence,
        type_name: "T".to_string(),
        profile,
        operation: StoreOperation::Search,
        description: "generated".to_string(),
        outcome,
        elapsed_us,
    }
}

fn profile_strategy() -> impl Strategy<Value = PerformanceProfile> {
    (0..PerformanceProfile::ALL.len()).prop_map(|index| PerformanceProfile::ALL[index])
}

proptest! {
    #[test]
    fn every_assertion_is_counted_once(
        entries in prop::collection::vec((0usize..8, profile_strategy(), 0u8..3, 0u64..10_000), 0..64)
    ) {
        let aggregator = ResultAggregator::new();
        for (sequence, (unit, profile, outcome, elapsed)) in entries.iter().enumerate() {
            aggregator.record(assertion(*unit, u32::try_from(sequence).unwrap(), *profile, *outcome, *elapsed));
        }
        let report = aggregator.report(metadata(), false).unwrap();

        prop_assert_eq!(report.totals.assertions, entries.len());
        prop_assert_eq!(report.profiles.len(), PerformanceProfile::ALL.len());
        let profile_total: usize = report.profiles.iter().map(|summary| summary.total).sum();
        prop_assert_eq!(profile_total, entries.len());
        prop_assert_eq!(report.totals.pass + report.totals.fail + report.totals.unsupported, entries.len());
        for summary in &report.profiles {
            prop_assert_eq!(summary.pass + summary.fail + summary.unsupported, summary.total);
            prop_assert_eq!(summary.samples, summary.pass + summary.fail);
            prop_assert_eq!(summary.min_us.is_some(), summary.samples > 0);
            if let (Some(min), Some(p50), Some(p95), Some(max)) =
                (summary.min_us, summary.p50_us, summary.p95_us, summary.max_us)
            {
                prop_assert!(min <= p50 && p50 <= p95 && p95 <= max);
            }
        }
        prop_assert!(report
            .assertions
            .windows(2)
            .all(|pair| (pair[0].unit_index, pair[0].sequence) <= (pair[1].unit_index, pair[1].sequence)));
    }
}

#[test]
fn concurrent_recording_keeps_every_assertion() {
    let aggregator = ResultAggregator::new();
    thread::scope(|scope| {
        for unit in 0..8usize {
            let aggregator = &aggregator;
            scope.spawn(move || {
                for sequence in 0..50u32 {
                    aggregator.record(assertion(unit, sequence, PerformanceProfile::EntityCreation, 0, 5));
                }
            });
        }
    });
    let report = aggregator.report(metadata(), false).unwrap();
    let summary = report.profile(PerformanceProfile::EntityCreation).unwrap();
    assert_eq!(summary.pass, 400);
    assert_eq!(summary.mean_us, Some(5));
    assert_eq!(report.assertions[0].unit_index, 0);
    assert_eq!(report.assertions[399].unit_index, 7);
}

#[test]
fn empty_profiles_are_still_reported() {
    let report = ResultAggregator::new().report(metadata(), true).unwrap();
    assert!(report.interrupted);
    assert!(report.profiles.iter().all(|summary| summary.total == 0 && summary.p95_us.is_none()));
}
