//! Per-type component storage.
//!
//! A [`Storage<T>`] owns every `T` value in a registry, keyed by entity
//! handle. Registries hold storages behind the object-safe [`TypedStorage`]
//! trait so that a single table can contain storages for an open set of
//! component types, including types only known by name at run time.

use std::any::Any;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::component::{Component, ComponentTypeId};
use crate::entity::Entity;
use crate::error::ComponentError;

/// Type-erased view of a [`Storage<T>`].
pub trait TypedStorage: Any {
    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// Identifier of the stored component type.
    fn component_type_id(&self) -> ComponentTypeId;

    /// Number of entities holding a value.
    fn len(&self) -> usize;

    /// Returns `true` if no entity holds a value.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles currently holding a value, in ascending order.
    fn entities(&self) -> Vec<Entity>;

    /// Returns `true` if `entity` holds a value.
    fn has(&self, entity: Entity) -> bool;

    /// Drop the value held by `entity`. Returns `true` if there was one.
    fn remove(&mut self, entity: Entity) -> bool;

    /// Duplicate `source`'s value under `target`, overwriting any value
    /// `target` already had. Returns `false` (and does nothing) if `source`
    /// holds no value.
    fn copy(&mut self, source: Entity, target: Entity) -> bool;

    /// Deep, independent copy of the whole storage.
    fn clone_storage(&self) -> Box<dyn TypedStorage>;

    /// Returns `true` if the component type declares an encoder.
    fn is_serializable(&self) -> bool;

    /// Encode `entity`'s value. `None` if absent or not serializable.
    fn serialize(&self, entity: Entity) -> Option<Value>;

    /// Decode `json` into `entity`'s value, starting from the current value
    /// (or the default if absent), and store the result.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotSerializable`] if the type has no
    /// encoder, or [`ComponentError::Encode`] if `json` does not decode.
    /// On error the stored value is left as it was.
    fn unserialize(&mut self, entity: Entity, json: &Value) -> Result<(), ComponentError>;

    /// Upcast for downcasting to the concrete [`Storage<T>`].
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete [`Storage<T>`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl std::fmt::Debug for dyn TypedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedStorage")
            .field("type_name", &self.type_name())
            .field("len", &self.len())
            .finish()
    }
}

/// Ordered map from entity handle to component value for one type.
#[derive(Debug, Clone)]
pub struct Storage<T: Component> {
    components: BTreeMap<Entity, T>,
}

impl<T: Component> Storage<T> {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
        }
    }

    /// Insert or overwrite `entity`'s value.
    pub fn add(&mut self, entity: Entity, value: T) {
        self.components.insert(entity, value);
    }

    /// Returns `entity`'s value, if any.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.components.get(&entity)
    }

    /// Returns `entity`'s value mutably, if any.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.components.get_mut(&entity)
    }

    /// Returns `entity`'s value, storing `T::default()` first if absent.
    pub fn get_or_default(&mut self, entity: Entity) -> &mut T {
        self.components.entry(entity).or_default()
    }

    /// Returns `true` if `entity` holds a value.
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.components.contains_key(&entity)
    }

    /// Remove and return `entity`'s value. No-op if absent.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.components.remove(&entity)
    }

    /// Visit every `(entity, value)` pair in ascending handle order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(Entity, &T),
    {
        for (&entity, value) in &self.components {
            visitor(entity, value);
        }
    }

    /// Visit every `(entity, value)` pair in ascending handle order with
    /// mutable access to the values.
    pub fn for_each_mut<F>(&mut self, mut visitor: F)
    where
        F: FnMut(Entity, &mut T),
    {
        for (&entity, value) in &mut self.components {
            visitor(entity, value);
        }
    }

    /// Iterate `(entity, value)` pairs in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.components.iter().map(|(&entity, value)| (entity, value))
    }

    /// Mutable form of [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.components.iter_mut().map(|(&entity, value)| (entity, value))
    }

    /// Number of entities holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if no entity holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl<T: Component> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> TypedStorage for Storage<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn component_type_id(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn len(&self) -> usize {
        self.components.len()
    }

    fn entities(&self) -> Vec<Entity> {
        self.components.keys().copied().collect()
    }

    fn has(&self, entity: Entity) -> bool {
        self.components.contains_key(&entity)
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.components.remove(&entity).is_some()
    }

    fn copy(&mut self, source: Entity, target: Entity) -> bool {
        match self.components.get(&source) {
            Some(value) => {
                let value = value.clone();
                self.components.insert(target, value);
                true
            }
            None => false,
        }
    }

    fn clone_storage(&self) -> Box<dyn TypedStorage> {
        Box::new(self.clone())
    }

    fn is_serializable(&self) -> bool {
        T::encoder().is_some()
    }

    fn serialize(&self, entity: Entity) -> Option<Value> {
        let encoder = T::encoder()?;
        self.components.get(&entity).map(|value| encoder.serialize(value))
    }

    fn unserialize(&mut self, entity: Entity, json: &Value) -> Result<(), ComponentError> {
        let encoder = T::encoder()
            .ok_or_else(|| ComponentError::NotSerializable(T::type_name().to_string()))?;
        let mut value = self.components.get(&entity).cloned().unwrap_or_default();
        encoder.unserialize(&mut value, json)?;
        self.components.insert(entity, value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
