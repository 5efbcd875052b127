//! Typed iteration and strict multi-component access.
//!
//! Joins walk the first type's storage in handle order and look the other
//! types up per entity, skipping entities that lack any of them. Storages are
//! borrowed disjointly, so the visitor gets plain `&mut` references but no
//! access to the registry itself; structural changes go through
//! [`Registry::release`] after the loop. [`Registry::for_each`] borrows the
//! registry shared instead, so its visitor can read other components.

use engine_component::{Component, ComponentTypeId, Entity, Storage};

use crate::error::RegistryError;
use crate::registry::{Registry, downcast_mut};

fn assert_distinct(ids: &[ComponentTypeId], names: &[&'static str]) {
    for (i, id) in ids.iter().enumerate() {
        assert!(
            !ids[i + 1..].contains(id),
            "join over repeated component type {}",
            names[i]
        );
    }
}

fn missing<T: Component>(entity: Entity) -> RegistryError {
    RegistryError::MissingComponent {
        component: T::type_name(),
        entity,
    }
}

impl Registry {
    /// Visit every `T` in handle order through a shared borrow.
    ///
    /// The visitor may read anything else in the registry while it runs.
    pub fn for_each<T, F>(&self, visitor: F)
    where
        T: Component,
        F: FnMut(Entity, &T),
    {
        if let Some(storage) = self.storage::<T>() {
            storage.for_each(visitor);
        }
    }

    /// Visit every `T` in handle order.
    pub fn each<T, F>(&mut self, mut visitor: F)
    where
        T: Component,
        F: FnMut(Entity, &mut T),
    {
        if let Some(storage) = self.existing_storage_mut::<T>() {
            for (entity, value) in storage.iter_mut() {
                visitor(entity, value);
            }
        }
    }

    /// Visit every entity holding both `T` and `S`.
    ///
    /// # Panics
    ///
    /// Panics if `T` and `S` are the same component type.
    pub fn each2<T, S, F>(&mut self, mut visitor: F)
    where
        T: Component,
        S: Component,
        F: FnMut(Entity, &mut T, &mut S),
    {
        let ids = [T::component_type_id(), S::component_type_id()];
        assert_distinct(&ids, &[T::type_name(), S::type_name()]);
        let [Some(t), Some(s)] = self.storages.get_disjoint_mut([&ids[0], &ids[1]]) else {
            return;
        };
        let (Some(t), Some(s)) = (downcast_mut::<T>(t), downcast_mut::<S>(s)) else {
            return;
        };
        for (entity, a) in t.iter_mut() {
            if let Some(b) = s.get_mut(entity) {
                visitor(entity, a, b);
            }
        }
    }

    /// Visit every entity holding `T`, `S`, and `U`.
    ///
    /// # Panics
    ///
    /// Panics if any two of the types are the same.
    pub fn each3<T, S, U, F>(&mut self, mut visitor: F)
    where
        T: Component,
        S: Component,
        U: Component,
        F: FnMut(Entity, &mut T, &mut S, &mut U),
    {
        let ids = [
            T::component_type_id(),
            S::component_type_id(),
            U::component_type_id(),
        ];
        assert_distinct(&ids, &[T::type_name(), S::type_name(), U::type_name()]);
        let [Some(t), Some(s), Some(u)] =
            self.storages.get_disjoint_mut([&ids[0], &ids[1], &ids[2]])
        else {
            return;
        };
        let (Some(t), Some(s), Some(u)) =
            (downcast_mut::<T>(t), downcast_mut::<S>(s), downcast_mut::<U>(u))
        else {
            return;
        };
        for (entity, a) in t.iter_mut() {
            if let (Some(b), Some(c)) = (s.get_mut(entity), u.get_mut(entity)) {
                visitor(entity, a, b, c);
            }
        }
    }

    /// Visit every entity holding `T`, `S`, `U`, and `V`.
    ///
    /// # Panics
    ///
    /// Panics if any two of the types are the same.
    pub fn each4<T, S, U, V, F>(&mut self, mut visitor: F)
    where
        T: Component,
        S: Component,
        U: Component,
        V: Component,
        F: FnMut(Entity, &mut T, &mut S, &mut U, &mut V),
    {
        let ids = [
            T::component_type_id(),
            S::component_type_id(),
            U::component_type_id(),
            V::component_type_id(),
        ];
        assert_distinct(
            &ids,
            &[T::type_name(), S::type_name(), U::type_name(), V::type_name()],
        );
        let [Some(t), Some(s), Some(u), Some(v)] =
            self.storages
                .get_disjoint_mut([&ids[0], &ids[1], &ids[2], &ids[3]])
        else {
            return;
        };
        let (Some(t), Some(s), Some(u), Some(v)) = (
            downcast_mut::<T>(t),
            downcast_mut::<S>(s),
            downcast_mut::<U>(u),
            downcast_mut::<V>(v),
        ) else {
            return;
        };
        for (entity, a) in t.iter_mut() {
            if let (Some(b), Some(c), Some(d)) =
                (s.get_mut(entity), u.get_mut(entity), v.get_mut(entity))
            {
                visitor(entity, a, b, c, d);
            }
        }
    }

    // -- Strict access --

    /// `entity`'s `T`; fails instead of creating it.
    pub fn get_entity<T: Component>(&mut self, entity: Entity) -> Result<&mut T, RegistryError> {
        self.check_live(entity)?;
        self.existing_storage_mut::<T>()
            .and_then(|storage| storage.get_mut(entity))
            .ok_or_else(|| missing::<T>(entity))
    }

    /// `entity`'s `T` and `S` together.
    ///
    /// # Panics
    ///
    /// Panics if `T` and `S` are the same component type.
    pub fn get_entity2<T: Component, S: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<(&mut T, &mut S), RegistryError> {
        self.check_live(entity)?;
        let ids = [T::component_type_id(), S::component_type_id()];
        assert_distinct(&ids, &[T::type_name(), S::type_name()]);
        let [t, s] = self.storages.get_disjoint_mut([&ids[0], &ids[1]]);
        let t = lookup::<T>(t.and_then(downcast_mut::<T>), entity)?;
        let s = lookup::<S>(s.and_then(downcast_mut::<S>), entity)?;
        Ok((t, s))
    }

    /// `entity`'s `T`, `S`, and `U` together.
    ///
    /// # Panics
    ///
    /// Panics if any two of the types are the same.
    pub fn get_entity3<T: Component, S: Component, U: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<(&mut T, &mut S, &mut U), RegistryError> {
        self.check_live(entity)?;
        let ids = [
            T::component_type_id(),
            S::component_type_id(),
            U::component_type_id(),
        ];
        assert_distinct(&ids, &[T::type_name(), S::type_name(), U::type_name()]);
        let [t, s, u] = self.storages.get_disjoint_mut([&ids[0], &ids[1], &ids[2]]);
        let t = lookup::<T>(t.and_then(downcast_mut::<T>), entity)?;
        let s = lookup::<S>(s.and_then(downcast_mut::<S>), entity)?;
        let u = lookup::<U>(u.and_then(downcast_mut::<U>), entity)?;
        Ok((t, s, u))
    }
}

fn lookup<T: Component>(
    storage: Option<&mut Storage<T>>,
    entity: Entity,
) -> Result<&mut T, RegistryError> {
    storage
        .and_then(|storage| storage.get_mut(entity))
        .ok_or_else(|| missing::<T>(entity))
}
