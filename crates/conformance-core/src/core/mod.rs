// crates/conformance-core/src/core/mod.rs
// ============================================================================
// Module: Conformance Core Types
// Description: Canonical type, instance, profile, and evidence structures.
// Purpose: Provide stable, serializable types shared by stores and the harness.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define the store-facing data model (type descriptors, instances,
//! properties) and the harness-facing evidence model (profiles, assertions).
//! These types are the canonical source of truth for reports and store
//! implementations alike.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod evidence;
pub mod hashing;
pub mod identifiers;
pub mod instances;
pub mod profile;
pub mod typedefs;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use evidence::Assertion;
pub use evidence::FailureDetail;
pub use evidence::Outcome;
pub use evidence::duration_to_micros;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::InstanceGuid;
pub use identifiers::MetadataCollectionId;
pub use identifiers::TestCaseId;
pub use identifiers::TypeId;
pub use identifiers::UserId;
pub use instances::Instance;
pub use instances::InstanceProperties;
pub use instances::InstanceRef;
pub use instances::InstanceStatus;
pub use instances::METADATA_COLLECTION_ID_PROPERTY;
pub use instances::MatchCriteria;
pub use instances::PropertyValue;
pub use instances::RelationshipEnds;
pub use profile::OperationFamily;
pub use profile::PerformanceProfile;
pub use profile::ProfileKind;
pub use profile::StoreOperation;
pub use typedefs::RelationshipEndTypes;
pub use typedefs::TypeCategory;
pub use typedefs::TypeDescriptor;
