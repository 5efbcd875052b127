//! Entity registry — one typed storage per component type.
//!
//! Values live in [`Storage<T>`]s keyed by [`ComponentTypeId`]. Typed access
//! downcasts through [`TypedStorage::as_any`]; name-based access (scenes,
//! queries) creates missing storages through the shared [`ComponentFactory`].
//!
//! Deletion is deferred: [`Registry::release`] queues a handle and
//! [`Registry::clean_up`] removes it from every storage and retires it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use engine_component::{
    Component, ComponentFactory, ComponentTypeId, Entity, EntityAllocator, Storage, TypedStorage,
};
use tracing::debug;

use crate::bundle::Bundle;
use crate::error::RegistryError;

/// Summary of one live entity, as reported by [`Registry::entities`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub entity: Entity,
    /// Names of the component types the entity holds, sorted.
    pub components: Vec<&'static str>,
}

/// The entity registry.
#[derive(Debug)]
pub struct Registry {
    factory: Arc<ComponentFactory>,
    pub(crate) storages: HashMap<ComponentTypeId, Box<dyn TypedStorage>>,
    allocator: EntityAllocator,
    released: Vec<Entity>,
    retired: HashSet<Entity>,
}

impl Registry {
    pub fn new(factory: Arc<ComponentFactory>) -> Self {
        Self {
            factory,
            storages: HashMap::new(),
            allocator: EntityAllocator::new(),
            released: Vec::new(),
            retired: HashSet::new(),
        }
    }

    /// The component type table shared with other registries.
    pub fn factory(&self) -> &Arc<ComponentFactory> {
        &self.factory
    }

    // -- Entity lifecycle --

    /// Allocate a fresh handle. Handles increase and are never reused.
    pub fn next_entity_id(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Allocate a handle and attach every component of `bundle` to it.
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> Result<Entity, RegistryError> {
        let entity = self.next_entity_id();
        bundle.insert(self, entity)?;
        Ok(entity)
    }

    /// Queue `entity` for removal at the next [`clean_up`](Self::clean_up).
    pub fn release(&mut self, entity: Entity) {
        if entity.is_valid() && !self.released.contains(&entity) {
            self.released.push(entity);
        }
    }

    /// Handles queued by [`release`](Self::release) and not yet cleaned up.
    pub fn pending_releases(&self) -> &[Entity] {
        &self.released
    }

    /// Remove every released handle from every storage and retire it.
    ///
    /// Only handles the allocator has already issued are retired; a handle
    /// released ahead of its allocation stays usable once it is handed out.
    /// Returns the number of handles retired.
    pub fn clean_up(&mut self) -> usize {
        if self.released.is_empty() {
            return 0;
        }
        let next = self.allocator.peek();
        let mut retired = 0;
        for entity in std::mem::take(&mut self.released) {
            for storage in self.storages.values_mut() {
                storage.remove(entity);
            }
            if entity < next && self.retired.insert(entity) {
                retired += 1;
            }
        }
        debug!(count = retired, "cleaned up released entities");
        retired
    }

    /// Returns `true` if `entity` was released and cleaned up.
    pub fn is_retired(&self, entity: Entity) -> bool {
        self.retired.contains(&entity)
    }

    /// Remove `entity` from every storage right away, outside the
    /// release/clean-up cycle. The handle is not retired.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let mut removed = false;
        for storage in self.storages.values_mut() {
            removed |= storage.remove(entity);
        }
        removed
    }

    /// Returns `true` if any storage holds a value for `entity`.
    pub fn contains(&self, entity: Entity) -> bool {
        self.storages.values().any(|storage| storage.has(entity))
    }

    /// Every live entity with the names of its component types, in handle order.
    pub fn entities(&self) -> BTreeMap<Entity, EntityInfo> {
        let mut out: BTreeMap<Entity, EntityInfo> = BTreeMap::new();
        for storage in self.storages.values() {
            for entity in storage.entities() {
                out.entry(entity)
                    .or_insert_with(|| EntityInfo {
                        entity,
                        components: Vec::new(),
                    })
                    .components
                    .push(storage.type_name());
            }
        }
        for info in out.values_mut() {
            info.components.sort_unstable();
        }
        out
    }

    pub(crate) fn reserve(&mut self, entity: Entity) {
        self.allocator.reserve(entity);
    }

    pub(crate) fn check_live(&self, entity: Entity) -> Result<(), RegistryError> {
        if !entity.is_valid() {
            return Err(RegistryError::InvalidHandle(entity.id().to_string()));
        }
        if self.is_retired(entity) {
            return Err(RegistryError::StaleHandle(entity));
        }
        Ok(())
    }

    // -- Component operations --

    /// Attach `value` to `entity`, overwriting any previous value.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), RegistryError> {
        self.check_live(entity)?;
        self.storage_mut::<T>()?.add(entity, value);
        Ok(())
    }

    /// Detach and return `entity`'s `T`, if any.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.existing_storage_mut::<T>()?.remove(entity)
    }

    /// Returns `true` if `entity` holds a `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|storage| storage.has(entity))
    }

    pub fn get_ptr<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    pub fn get_ptr_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.existing_storage_mut::<T>()?.get_mut(entity)
    }

    /// A copy of `entity`'s `T`, if any.
    pub fn get_cloned<T: Component>(&self, entity: Entity) -> Option<T> {
        self.get_ptr::<T>(entity).cloned()
    }

    /// `entity`'s `T`, storing `T::default()` first if it has none.
    pub fn get<T: Component>(&mut self, entity: Entity) -> Result<&mut T, RegistryError> {
        self.check_live(entity)?;
        Ok(self.storage_mut::<T>()?.get_or_default(entity))
    }

    /// Every entity holding a `T`, in handle order.
    pub fn find_all<T: Component>(&self) -> Vec<Entity> {
        self.storage::<T>()
            .map(|storage| storage.iter().map(|(entity, _)| entity).collect())
            .unwrap_or_default()
    }

    /// Copy every component of `source` onto `target`, overwriting.
    pub fn copy(&mut self, source: Entity, target: Entity) -> Result<Entity, RegistryError> {
        self.check_live(target)?;
        for storage in self.storages.values_mut() {
            storage.copy(source, target);
        }
        Ok(target)
    }

    /// Make this registry a deep, independent copy of `other`.
    ///
    /// Storages `other` lacks are dropped. The handle counter, retired set,
    /// and pending releases are taken over too, so handles allocated here
    /// afterwards never collide with `other`'s.
    pub fn copy_from(&mut self, other: &Registry) {
        self.storages = other
            .storages
            .iter()
            .map(|(id, storage)| (*id, storage.clone_storage()))
            .collect();
        self.allocator = other.allocator.clone();
        self.released = other.released.clone();
        self.retired = other.retired.clone();
        debug!(
            storages = self.storages.len(),
            next = %self.allocator.peek(),
            "copied registry"
        );
    }

    // -- Storage access --

    /// The storage registered under `type_name`, created through the factory
    /// if this registry has none yet.
    pub fn storage_by_name(
        &mut self,
        type_name: &str,
    ) -> Result<&mut dyn TypedStorage, RegistryError> {
        let id = self.resolve(type_name)?;
        if !self.storages.contains_key(&id) {
            let storage = self.factory.create(type_name)?;
            self.storages.insert(id, storage);
        }
        self.storages
            .get_mut(&id)
            .map(|storage| &mut **storage)
            .ok_or_else(|| RegistryError::UnknownComponentType(type_name.to_string()))
    }

    /// Names of the component types this registry holds storages for, sorted.
    pub fn storage_names(&self) -> Vec<&'static str> {
        let names: BTreeSet<_> = self.storages.values().map(|s| s.type_name()).collect();
        names.into_iter().collect()
    }

    /// Map a type name to its id, accepting names known to the factory or
    /// to a storage already present here.
    pub(crate) fn resolve(&self, type_name: &str) -> Result<ComponentTypeId, RegistryError> {
        let id = ComponentTypeId::from_name(type_name);
        match self.storages.get(&id) {
            Some(storage) if storage.type_name() == type_name => Ok(id),
            _ => Ok(self.factory.resolve(type_name)?),
        }
    }

    pub(crate) fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        self.storages
            .get(&T::component_type_id())?
            .as_any()
            .downcast_ref::<Storage<T>>()
    }

    pub(crate) fn existing_storage_mut<T: Component>(&mut self) -> Option<&mut Storage<T>> {
        downcast_mut::<T>(self.storages.get_mut(&T::component_type_id())?)
    }

    pub(crate) fn storage_mut<T: Component>(&mut self) -> Result<&mut Storage<T>, RegistryError> {
        let storage = self
            .storages
            .entry(T::component_type_id())
            .or_insert_with(|| Box::new(Storage::<T>::new()));
        downcast_mut::<T>(storage).ok_or(RegistryError::TypeConflict(T::type_name()))
    }
}

pub(crate) fn downcast_mut<T: Component>(
    storage: &mut Box<dyn TypedStorage>,
) -> Option<&mut Storage<T>> {
    storage.as_any_mut().downcast_mut::<Storage<T>>()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::components::{Info, register_all_components};
    use engine_component::Encodable;

    #[derive(Debug, Clone, Default, PartialEq)]
    pub(crate) struct Health {
        pub(crate) current: f32,
    }

    engine_component::encoder!(Health {
        "current" => current: f32,
    });

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }

        fn encoder() -> Option<&'static engine_component::Encoder<Self>> {
            Some(Self::encoding())
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub(crate) struct Tag;

    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    pub(crate) fn registry() -> Registry {
        let mut factory = register_all_components().unwrap();
        factory.register::<Health>().unwrap();
        factory.register::<Tag>().unwrap();
        Registry::new(Arc::new(factory))
    }

    #[test]
    fn test_handles_are_unique_and_increasing() {
        let mut reg = registry();
        let a = reg.next_entity_id();
        let b = reg.next_entity_id();
        let c = reg.next_entity_id();
        assert!(a.is_valid());
        assert!(a < b && b < c);
    }

    #[test]
    fn test_add_then_get() {
        let mut reg = registry();
        let e = reg.next_entity_id();
        reg.add_component(e, Health { current: 3.0 }).unwrap();
        assert!(reg.has::<Health>(e));
        assert_eq!(reg.get_ptr::<Health>(e), Some(&Health { current: 3.0 }));
        assert_eq!(reg.get_cloned::<Health>(e), Some(Health { current: 3.0 }));
        assert!(!reg.has::<Tag>(e));
    }

    #[test]
    fn test_get_auto_vivifies_default() {
        let mut reg = registry();
        let e = reg.next_entity_id();
        assert!(reg.get_ptr::<Health>(e).is_none());
        reg.get::<Health>(e).unwrap().current = 7.0;
        assert_eq!(reg.get_ptr::<Health>(e), Some(&Health { current: 7.0 }));
    }

    #[test]
    fn test_get_ptr_mut_does_not_create() {
        let mut reg = registry();
        let e = reg.next_entity_id();
        assert!(reg.get_ptr_mut::<Health>(e).is_none());
        assert!(!reg.has::<Health>(e));
    }

    #[test]
    fn test_remove_component() {
        let mut reg = registry();
        let e = reg.create_entity((Health { current: 1.0 }, Tag)).unwrap();
        assert_eq!(reg.remove_component::<Health>(e), Some(Health { current: 1.0 }));
        assert_eq!(reg.remove_component::<Health>(e), None);
        assert!(reg.has::<Tag>(e));
    }

    #[test]
    fn test_create_entity_with_bundle() {
        let mut reg = registry();
        let e = reg
            .create_entity((
                Info {
                    name: "player".into(),
                    ..Info::default()
                },
                Health { current: 10.0 },
            ))
            .unwrap();
        assert_eq!(reg.get_ptr::<Info>(e).unwrap().name, "player");
        assert_eq!(reg.entities()[&e].components, vec!["Health", "Info"]);
    }

    #[test]
    fn test_release_defers_until_clean_up() {
        let mut reg = registry();
        let e = reg.create_entity((Health { current: 1.0 }, Tag)).unwrap();
        reg.release(e);
        reg.release(e);
        assert!(reg.has::<Health>(e));
        assert_eq!(reg.pending_releases(), &[e]);

        assert_eq!(reg.clean_up(), 1);
        assert!(!reg.has::<Health>(e));
        assert!(!reg.has::<Tag>(e));
        assert!(!reg.contains(e));
        assert!(reg.is_retired(e));
        assert_eq!(reg.clean_up(), 0);
    }

    #[test]
    fn test_retired_handle_is_rejected() {
        let mut reg = registry();
        let e = reg.create_entity((Tag,)).unwrap();
        reg.release(e);
        reg.clean_up();

        assert!(matches!(
            reg.add_component(e, Tag),
            Err(RegistryError::StaleHandle(h)) if h == e
        ));
        assert!(matches!(reg.get::<Health>(e), Err(RegistryError::StaleHandle(_))));
        assert!(!reg.has::<Health>(e));

        let next = reg.next_entity_id();
        assert!(next > e);
    }

    #[test]
    fn test_release_of_unissued_handle_does_not_poison_it() {
        let mut reg = registry();
        let ahead = Entity(3);
        reg.release(ahead);
        assert_eq!(reg.clean_up(), 0);
        assert!(!reg.is_retired(ahead));

        let issued: Vec<Entity> = (0..3).map(|_| reg.next_entity_id()).collect();
        assert_eq!(issued.last(), Some(&ahead));
        reg.add_component(ahead, Health { current: 1.0 }).unwrap();
        assert_eq!(reg.get::<Health>(ahead).unwrap().current, 1.0);

        reg.release(ahead);
        assert_eq!(reg.clean_up(), 1);
        assert!(reg.is_retired(ahead));
    }

    #[test]
    fn test_invalid_handle_is_rejected() {
        let mut reg = registry();
        assert!(matches!(
            reg.add_component(Entity::INVALID, Tag),
            Err(RegistryError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_remove_entity_is_immediate() {
        let mut reg = registry();
        let e = reg.create_entity((Health { current: 1.0 }, Tag)).unwrap();
        assert!(reg.remove_entity(e));
        assert!(!reg.contains(e));
        assert!(!reg.is_retired(e));
        assert!(!reg.remove_entity(e));
    }

    #[test]
    fn test_copy_duplicates_every_component() {
        let mut reg = registry();
        let source = reg
            .create_entity((Health { current: 4.0 }, Info::default()))
            .unwrap();
        let target = reg.next_entity_id();
        reg.copy(source, target).unwrap();

        assert_eq!(reg.get_cloned::<Health>(target), reg.get_cloned::<Health>(source));
        assert_eq!(reg.get_cloned::<Info>(target), reg.get_cloned::<Info>(source));

        reg.get::<Health>(target).unwrap().current = 9.0;
        assert_eq!(reg.get_ptr::<Health>(source).unwrap().current, 4.0);
    }

    #[test]
    fn test_copy_from_is_deep_and_independent() {
        let mut host = registry();
        let a = host.create_entity((Health { current: 1.0 }, Tag)).unwrap();
        let b = host.create_entity((Info::default(),)).unwrap();

        let mut module = registry();
        let stale = module.create_entity((Tag,)).unwrap();
        module.add_component(stale, Health::default()).unwrap();
        module.copy_from(&host);

        assert_eq!(module.entities(), host.entities());
        module.get::<Health>(a).unwrap().current = 50.0;
        module.release(b);
        module.clean_up();

        assert_eq!(host.get_ptr::<Health>(a).unwrap().current, 1.0);
        assert!(host.has::<Info>(b));

        let fresh = module.next_entity_id();
        assert!(fresh > b);
    }

    #[test]
    fn test_copy_from_drops_storages_missing_in_source() {
        let mut host = registry();
        host.create_entity((Tag,)).unwrap();

        let mut module = registry();
        module.create_entity((Health::default(),)).unwrap();
        module.copy_from(&host);

        assert_eq!(module.storage_names(), vec!["Tag"]);
        assert!(module.find_all::<Health>().is_empty());
    }

    #[test]
    fn test_find_all_in_handle_order() {
        let mut reg = registry();
        let a = reg.create_entity((Tag,)).unwrap();
        let _ = reg.create_entity((Health::default(),)).unwrap();
        let c = reg.create_entity((Tag,)).unwrap();
        assert_eq!(reg.find_all::<Tag>(), vec![a, c]);
    }

    #[test]
    fn test_storage_by_name_creates_through_factory() {
        let mut reg = registry();
        let storage = reg.storage_by_name("Health").unwrap();
        assert_eq!(storage.type_name(), "Health");
        assert!(storage.is_empty());
        assert!(matches!(
            reg.storage_by_name("Ghost"),
            Err(RegistryError::UnknownComponentType(name)) if name == "Ghost"
        ));
    }
}
