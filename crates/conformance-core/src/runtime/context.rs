// crates/conformance-core/src/runtime/context.rs
// ============================================================================
// Module: Work Context
// Description: Shared run state handed to every test unit.
// Purpose: Carry the store handle, TUT identity, and evidence sinks.
// Dependencies: rand, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`WorkContext`] is created once per run and shared read-only by all
//! workers. The only mutable state it exposes is the [`ResultAggregator`],
//! which is internally synchronized.
//!
//! Fresh identities for re-identification come from an [`IdentityGenerator`]
//! so tests can inject deterministic or colliding sequences.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::InstanceGuid;
use crate::core::MetadataCollectionId;
use crate::core::UserId;
use crate::interfaces::InstanceStore;
use crate::runtime::aggregator::ResultAggregator;
use crate::runtime::events::HarnessEventSink;
use crate::runtime::events::NoopEventSink;

// ============================================================================
// SECTION: Identity Generation
// ============================================================================

/// Source of fresh instance identities.
pub trait IdentityGenerator: Send + Sync {
    /// Returns the next identity.
    fn next_identity(&self) -> InstanceGuid;
}

/// Random identities formatted as RFC 4122 version-4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentityGenerator;

impl IdentityGenerator for RandomIdentityGenerator {
    fn next_identity(&self) -> InstanceGuid {
        let mut bytes: [u8; 16] = rand::random();
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        let mut out = String::with_capacity(36);
        for (index, byte) in bytes.iter().enumerate() {
            if matches!(index, 4 | 6 | 8 | 10) {
                out.push('-');
            }
            let _ = write!(out, "{byte:02x}");
        }
        InstanceGuid::new(out)
    }
}

/// Deterministic `<prefix>-<n>` identities.
#[derive(Debug)]
pub struct SequentialIdentityGenerator {
    /// Identity prefix.
    prefix: String,
    /// Next counter value.
    next: AtomicU64,
}

impl SequentialIdentityGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdentityGenerator for SequentialIdentityGenerator {
    fn next_identity(&self) -> InstanceGuid {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        InstanceGuid::new(format!("{}-{value}", self.prefix))
    }
}

/// Replays a fixed list of identities, then falls back to another generator.
pub struct ScriptedIdentityGenerator {
    /// Remaining scripted identities.
    script: Mutex<Vec<InstanceGuid>>,
    /// Generator used once the script is exhausted.
    fallback: Arc<dyn IdentityGenerator>,
}

impl ScriptedIdentityGenerator {
    /// Creates a generator that yields `script` in order before `fallback`.
    #[must_use]
    pub fn new(script: Vec<InstanceGuid>, fallback: Arc<dyn IdentityGenerator>) -> Self {
        let mut script = script;
        script.reverse();
        Self {
            script: Mutex::new(script),
            fallback,
        }
    }
}

impl IdentityGenerator for ScriptedIdentityGenerator {
    fn next_identity(&self) -> InstanceGuid {
        let scripted = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop();
        scripted.unwrap_or_else(|| self.fallback.next_identity())
    }
}

// ============================================================================
// SECTION: Work Context
// ============================================================================

/// Identity of the technology under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutIdentity {
    /// Display name of the server under test.
    pub server_name: String,
    /// Collection whose instances the harness may mutate.
    pub collection_id: MetadataCollectionId,
}

/// Shared, read-only state for one harness run.
///
/// # Invariants
/// - `instances_per_type` is at least 1.
/// - All units in a run observe the same store, identity, and aggregator.
pub struct WorkContext {
    /// Store under test.
    store: Arc<dyn InstanceStore>,
    /// TUT identity.
    tut: TutIdentity,
    /// Caller identity passed on every contract call.
    user_id: UserId,
    /// Instances created or exercised per type.
    instances_per_type: usize,
    /// Fresh identity source.
    identities: Arc<dyn IdentityGenerator>,
    /// Lifecycle event sink.
    events: Arc<dyn HarnessEventSink>,
    /// Evidence sink.
    results: Arc<ResultAggregator>,
}

impl WorkContext {
    /// Creates a context with random identities and no event output.
    #[must_use]
    pub fn new(
        store: Arc<dyn InstanceStore>,
        tut: TutIdentity,
        user_id: UserId,
        instances_per_type: usize,
    ) -> Self {
        Self {
            store,
            tut,
            user_id,
            instances_per_type: instances_per_type.max(1),
            identities: Arc::new(RandomIdentityGenerator),
            events: Arc::new(NoopEventSink),
            results: Arc::new(ResultAggregator::new()),
        }
    }

    /// Replaces the identity generator.
    #[must_use]
    pub fn with_identities(mut self, identities: Arc<dyn IdentityGenerator>) -> Self {
        self.identities = identities;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn HarnessEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replaces the result aggregator.
    #[must_use]
    pub fn with_results(mut self, results: Arc<ResultAggregator>) -> Self {
        self.results = results;
        self
    }

    /// Returns the store under test.
    #[must_use]
    pub fn store(&self) -> &dyn InstanceStore {
        self.store.as_ref()
    }

    /// Returns the TUT identity.
    #[must_use]
    pub const fn tut(&self) -> &TutIdentity {
        &self.tut
    }

    /// Returns the caller identity.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the per-type instance count.
    #[must_use]
    pub const fn instances_per_type(&self) -> usize {
        self.instances_per_type
    }

    /// Returns the identity generator.
    #[must_use]
    pub fn identities(&self) -> &dyn IdentityGenerator {
        self.identities.as_ref()
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &dyn HarnessEventSink {
        self.events.as_ref()
    }

    /// Returns the evidence aggregator.
    #[must_use]
    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }
}
