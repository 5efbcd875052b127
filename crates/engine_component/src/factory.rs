//! Component type registry.
//!
//! Maps component type names to constructors of empty [`TypedStorage`]s. A
//! registry consults this table whenever it needs a storage for a type it
//! only knows by name, most importantly when loading a scene document.
//!
//! The table is filled once at start-up by an explicit registration call and
//! then shared, read-only, by every registry in the process.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::component::{Component, ComponentTypeId};
use crate::error::ComponentError;
use crate::storage::{Storage, TypedStorage};

type StorageCtor = fn() -> Box<dyn TypedStorage>;

fn new_storage<T: Component>() -> Box<dyn TypedStorage> {
    Box::new(Storage::<T>::new())
}

/// A single registered component type.
#[derive(Debug, Clone, Copy)]
struct Registration {
    name: &'static str,
    rust_type: TypeId,
    create: StorageCtor,
}

/// Name-keyed table of storage constructors.
#[derive(Debug, Default, Clone)]
pub struct ComponentFactory {
    types: HashMap<ComponentTypeId, Registration>,
}

impl ComponentFactory {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register component type `T` under [`Component::type_name`].
    ///
    /// Registering the same type twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::DuplicateComponentType`] if a different
    /// Rust type already uses the name.
    pub fn register<T: Component>(&mut self) -> Result<ComponentTypeId, ComponentError> {
        let id = T::component_type_id();
        let rust_type = TypeId::of::<T>();
        if let Some(existing) = self.types.get(&id) {
            if existing.rust_type == rust_type {
                return Ok(id);
            }
            return Err(ComponentError::DuplicateComponentType(
                T::type_name().to_string(),
            ));
        }

        self.types.insert(
            id,
            Registration {
                name: T::type_name(),
                rust_type,
                create: new_storage::<T>,
            },
        );
        debug!(
            component = T::type_name(),
            serializable = T::encoder().is_some(),
            "registered component type"
        );
        Ok(id)
    }

    /// Create an empty storage for the type registered as `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownComponentType`] if nothing is
    /// registered under that name.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn TypedStorage>, ComponentError> {
        self.lookup(type_name)
            .map(|registration| (registration.create)())
            .ok_or_else(|| ComponentError::UnknownComponentType(type_name.to_string()))
    }

    /// Resolve a type name to its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownComponentType`] if nothing is
    /// registered under that name.
    pub fn resolve(&self, type_name: &str) -> Result<ComponentTypeId, ComponentError> {
        self.lookup(type_name)
            .map(|_| ComponentTypeId::from_name(type_name))
            .ok_or_else(|| ComponentError::UnknownComponentType(type_name.to_string()))
    }

    /// Returns `true` if a type is registered under `type_name`.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.lookup(type_name).is_some()
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.values().map(|r| r.name).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn lookup(&self, type_name: &str) -> Option<&Registration> {
        self.types
            .get(&ComponentTypeId::from_name(type_name))
            .filter(|registration| registration.name == type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Velocity {
        x: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Impostor;

    impl Component for Impostor {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut factory = ComponentFactory::new();
        let first = factory.register::<Velocity>().unwrap();
        let second = factory.register::<Velocity>().unwrap();
        assert_eq!(first, second);
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_create_by_name() {
        let mut factory = ComponentFactory::new();
        factory.register::<Velocity>().unwrap();

        let mut storage = factory.create("Velocity").unwrap();
        assert_eq!(storage.type_name(), "Velocity");
        assert!(storage.is_empty());

        let typed = storage
            .as_any_mut()
            .downcast_mut::<Storage<Velocity>>()
            .unwrap();
        typed.add(Entity(1), Velocity { x: 1.0 });
        assert!(storage.has(Entity(1)));
    }

    #[test]
    fn test_create_unknown_name_fails() {
        let factory = ComponentFactory::new();
        assert!(matches!(
            factory.create("Ghost"),
            Err(ComponentError::UnknownComponentType(name)) if name == "Ghost"
        ));
        assert!(factory.resolve("Ghost").is_err());
    }

    #[test]
    fn test_conflicting_name_is_rejected() {
        let mut factory = ComponentFactory::new();
        factory.register::<Velocity>().unwrap();
        assert!(matches!(
            factory.register::<Impostor>(),
            Err(ComponentError::DuplicateComponentType(_))
        ));
    }

    #[test]
    fn test_type_names_sorted() {
        #[derive(Debug, Clone, Default)]
        struct Alpha;
        impl Component for Alpha {
            fn type_name() -> &'static str {
                "Alpha"
            }
        }

        let mut factory = ComponentFactory::new();
        factory.register::<Velocity>().unwrap();
        factory.register::<Alpha>().unwrap();
        assert_eq!(factory.type_names(), vec!["Alpha", "Velocity"]);
        assert!(factory.contains("Alpha"));
        assert!(!factory.contains("alpha"));
    }
}
