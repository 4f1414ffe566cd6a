// crates/conformance-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Instance Store
// Description: Reference store implementation backed by a shared map.
// Purpose: Provide a fully conformant store for tests and harness self-checks.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryInstanceStore`] implements the whole store contract behind a
//! single mutex so identity mutations (including relationship end rewrites)
//! are atomic. Individual optional operations can be switched off to emulate
//! partially conformant technologies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Instance;
use crate::core::InstanceGuid;
use crate::core::InstanceRef;
use crate::core::InstanceStatus;
use crate::core::MetadataCollectionId;
use crate::core::StoreOperation;
use crate::core::TypeCategory;
use crate::core::TypeDescriptor;
use crate::core::UserId;
use crate::interfaces::ContractError;
use crate::interfaces::InstanceStore;
use crate::interfaces::NewInstance;
use crate::interfaces::SearchRequest;
use crate::runtime::context::IdentityGenerator;
use crate::runtime::context::RandomIdentityGenerator;

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory store for harness tests and demonstrations.
///
/// # Invariants
/// - Every relationship end references an instance present in the store.
/// - Deleted instances are invisible to search but addressable by identity.
#[derive(Clone)]
pub struct InMemoryInstanceStore {
    /// Collection this store homes new instances in.
    collection_id: MetadataCollectionId,
    /// Identity source for created instances.
    identities: Arc<dyn IdentityGenerator>,
    /// Operations reported as unsupported.
    unsupported: BTreeSet<StoreOperation>,
    /// Whether concurrent mutation is declared safe.
    concurrent: bool,
    /// Hard cap on returned search pages.
    max_page_size: Option<usize>,
    /// Instances keyed by identity.
    instances: Arc<Mutex<BTreeMap<InstanceGuid, Instance>>>,
}

impl InMemoryInstanceStore {
    /// Creates an empty, fully capable store.
    #[must_use]
    pub fn new(collection_id: MetadataCollectionId) -> Self {
        Self {
            collection_id,
            identities: Arc::new(RandomIdentityGenerator),
            unsupported: BTreeSet::new(),
            concurrent: true,
            max_page_size: None,
            instances: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Reports the given operations as unsupported.
    #[must_use]
    pub fn with_unsupported(mut self, operations: impl IntoIterator<Item = StoreOperation>) -> Self {
        self.unsupported.extend(operations);
        self
    }

    /// Declares whether concurrent identity mutation is safe.
    #[must_use]
    pub const fn with_concurrent_mutation(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Caps the number of instances returned per search.
    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = Some(max_page_size);
        self
    }

    /// Replaces the identity source for created instances.
    #[must_use]
    pub fn with_identities(mut self, identities: Arc<dyn IdentityGenerator>) -> Self {
        self.identities = identities;
        self
    }

    /// Inserts an instance verbatim, including foreign-collection instances.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Conflict`] when the identity is already held,
    /// or [`ContractError::NotFound`] when a relationship end is missing.
    pub fn seed(&self, instance: Instance) -> Result<(), ContractError> {
        let mut instances = self.lock(StoreOperation::AddInstance)?;
        if instances.contains_key(instance.guid()) {
            return Err(ContractError::conflict(
                StoreOperation::AddInstance,
                instance.guid(),
                "identity already in use",
            ));
        }
        if let Some(ends) = &instance.ends {
            for end in [&ends.end_one, &ends.end_two] {
                if !instances.contains_key(end) {
                    return Err(ContractError::not_found(StoreOperation::AddInstance, end));
                }
            }
        }
        instances.insert(instance.guid().clone(), instance);
        Ok(())
    }

    /// Returns a snapshot of an instance regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationError`] when the store lock is poisoned.
    pub fn snapshot(&self, guid: &InstanceGuid) -> Result<Option<Instance>, ContractError> {
        Ok(self.lock(StoreOperation::GetInstance)?.get(guid).cloned())
    }

    /// Returns the number of stored instances (all statuses).
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationError`] when the store lock is poisoned.
    pub fn len(&self) -> Result<usize, ContractError> {
        Ok(self.lock(StoreOperation::Search)?.len())
    }

    /// Returns true when no instances are stored.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::OperationError`] when the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, ContractError> {
        Ok(self.len()? == 0)
    }

    /// Fails with `CapabilityUnsupported` for switched-off operations.
    fn check(&self, operation: StoreOperation) -> Result<(), ContractError> {
        if self.unsupported.contains(&operation) {
            return Err(ContractError::unsupported(operation));
        }
        Ok(())
    }

    /// Locks the instance map.
    fn lock(
        &self,
        operation: StoreOperation,
    ) -> Result<MutexGuard<'_, BTreeMap<InstanceGuid, Instance>>, ContractError> {
        self.instances
            .lock()
            .map_err(|_| ContractError::operation(operation, "instance store mutex poisoned"))
    }
}

/// Looks up an instance and checks it carries the expected type.
fn typed_instance<'m>(
    instances: &'m mut BTreeMap<InstanceGuid, Instance>,
    operation: StoreOperation,
    type_def: &TypeDescriptor,
    guid: &InstanceGuid,
) -> Result<&'m mut Instance, ContractError> {
    let instance =
        instances.get_mut(guid).ok_or_else(|| ContractError::not_found(operation, guid))?;
    if instance.header.type_id != type_def.id {
        return Err(ContractError::conflict(
            operation,
            guid,
            format!("instance is of type {} not {}", instance.header.type_name, type_def.name),
        ));
    }
    Ok(instance)
}

impl InstanceStore for InMemoryInstanceStore {
    fn metadata_collection_id(&self) -> MetadataCollectionId {
        self.collection_id.clone()
    }

    fn supports_concurrent_mutation(&self) -> bool {
        self.concurrent
    }

    fn search(
        &self,
        _user: &UserId,
        request: &SearchRequest,
    ) -> Result<Vec<Instance>, ContractError> {
        self.check(StoreOperation::Search)?;
        let page_size = if request.page_size == 0 { request.limit } else { request.page_size };
        let mut take = page_size.min(request.limit);
        if let Some(max) = self.max_page_size {
            take = take.min(max);
        }
        let instances = self.lock(StoreOperation::Search)?;
        Ok(instances
            .values()
            .filter(|instance| {
                instance.header.type_id == request.type_id
                    && instance.status == InstanceStatus::Active
                    && request.predicate.matches(instance, request.criteria)
            })
            .skip(request.page_start)
            .take(take)
            .cloned()
            .collect())
    }

    fn add_instance(
        &self,
        _user: &UserId,
        request: &NewInstance,
    ) -> Result<Option<Instance>, ContractError> {
        self.check(StoreOperation::AddInstance)?;
        let operation = StoreOperation::AddInstance;
        match (request.type_def.category, &request.ends) {
            (TypeCategory::Classification, _) => {
                return Err(ContractError::operation(
                    operation,
                    "classifications are not standalone instances",
                ));
            }
            (TypeCategory::Relationship, None) => {
                return Err(ContractError::operation(operation, "relationship requires two ends"));
            }
            (TypeCategory::Entity, Some(_)) => {
                return Err(ContractError::operation(operation, "entities cannot carry ends"));
            }
            _ => {}
        }
        let guid = self.identities.next_identity();
        let mut instances = self.lock(operation)?;
        if let Some(ends) = &request.ends {
            for end in [&ends.end_one, &ends.end_two] {
                let active = instances
                    .get(end)
                    .is_some_and(|instance| instance.status == InstanceStatus::Active);
                if !active {
                    return Err(ContractError::not_found(operation, end));
                }
            }
        }
        if instances.contains_key(&guid) {
            return Err(ContractError::conflict(operation, &guid, "identity already in use"));
        }
        let instance = Instance {
            header: InstanceRef {
                guid: guid.clone(),
                collection_id: self.collection_id.clone(),
                type_id: request.type_def.id.clone(),
                type_name: request.type_def.name.clone(),
                version: 1,
            },
            properties: request.properties.clone(),
            status: InstanceStatus::Active,
            ends: request.ends.clone(),
        };
        instances.insert(guid, instance.clone());
        Ok(Some(instance))
    }

    fn get_instance(
        &self,
        _user: &UserId,
        _type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        self.check(StoreOperation::GetInstance)?;
        Ok(self.lock(StoreOperation::GetInstance)?.get(guid).cloned())
    }

    fn re_identify(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        old: &InstanceGuid,
        new: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::ReIdentify;
        self.check(operation)?;
        let mut instances = self.lock(operation)?;
        typed_instance(&mut instances, operation, type_def, old)?;
        if instances.contains_key(new) {
            return Err(ContractError::conflict(operation, new, "identity already in use"));
        }
        let Some(mut instance) = instances.remove(old) else {
            return Err(ContractError::not_found(operation, old));
        };
        instance.header.guid = new.clone();
        if type_def.category == TypeCategory::Entity {
            for relationship in instances.values_mut() {
                if let Some(ends) = relationship.ends.as_mut() {
                    if ends.end_one == *old {
                        ends.end_one = new.clone();
                    }
                    if ends.end_two == *old {
                        ends.end_two = new.clone();
                    }
                }
            }
        }
        instances.insert(new.clone(), instance.clone());
        Ok(Some(instance))
    }

    fn re_type(
        &self,
        _user: &UserId,
        guid: &InstanceGuid,
        current: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::ReType;
        self.check(operation)?;
        if current.category != target.category {
            return Err(ContractError::operation(
                operation,
                format!("cannot re-type {} to {}", current.category, target.category),
            ));
        }
        let mut instances = self.lock(operation)?;
        let instance = typed_instance(&mut instances, operation, current, guid)?;
        instance.header.type_id = target.id.clone();
        instance.header.type_name = target.name.clone();
        instance.header.version += 1;
        Ok(Some(instance.clone()))
    }

    fn delete(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::Delete;
        self.check(operation)?;
        let mut instances = self.lock(operation)?;
        let instance = typed_instance(&mut instances, operation, type_def, guid)?;
        if instance.status == InstanceStatus::Deleted {
            return Err(ContractError::not_found(operation, guid));
        }
        instance.status = InstanceStatus::Deleted;
        instance.header.version += 1;
        Ok(Some(instance.clone()))
    }

    fn restore(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<Option<Instance>, ContractError> {
        let operation = StoreOperation::Restore;
        self.check(operation)?;
        let mut instances = self.lock(operation)?;
        let instance = typed_instance(&mut instances, operation, type_def, guid)?;
        if instance.status == InstanceStatus::Active {
            return Err(ContractError::conflict(operation, guid, "instance is not deleted"));
        }
        instance.status = InstanceStatus::Active;
        instance.header.version += 1;
        Ok(Some(instance.clone()))
    }

    fn purge(
        &self,
        _user: &UserId,
        type_def: &TypeDescriptor,
        guid: &InstanceGuid,
    ) -> Result<(), ContractError> {
        let operation = StoreOperation::Purge;
        self.check(operation)?;
        let soft_delete = !self.unsupported.contains(&StoreOperation::Delete);
        let mut instances = self.lock(operation)?;
        let instance = typed_instance(&mut instances, operation, type_def, guid)?;
        if soft_delete && instance.status == InstanceStatus::Active {
            return Err(ContractError::conflict(operation, guid, "instance must be deleted first"));
        }
        instances.remove(guid);
        if type_def.category == TypeCategory::Entity {
            instances.retain(|_, relationship| {
                relationship.ends.as_ref().is_none_or(|ends| !ends.references(guid))
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::InMemoryInstanceStore;
    use crate::core::MetadataCollectionId;
    use crate::core::StoreOperation;
    use crate::core::TypeDescriptor;
    use crate::core::UserId;
    use crate::interfaces::ContractError;
    use crate::interfaces::InstanceStore;

    #[test]
    fn switched_off_operations_report_unsupported() {
        let store = InMemoryInstanceStore::new(MetadataCollectionId::new("c1"))
            .with_unsupported([StoreOperation::ReType]);
        let entity = TypeDescriptor::entity("t1", "Thing");
        let sub = TypeDescriptor::entity("t2", "SubThing");
        let result = store.re_type(&UserId::new("u"), &"g".into(), &entity, &sub);
        assert_eq!(result, Err(ContractError::unsupported(StoreOperation::ReType)));
    }
}
