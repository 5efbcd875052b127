//! Scene documents: `{ "<handle>": { "<TypeName>": { ...fields } } }`.
//!
//! Documents carry literal handles. Loading reuses them and pushes the
//! registry's allocator past the highest one, so handles allocated later never
//! collide with loaded entities.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use engine_component::{ComponentTypeId, Entity, TypedStorage};
use serde_json::{Map, Value};
use tracing::info;

use crate::components::{Info, Proto, Ref};
use crate::error::{RegistryError, SceneError};
use crate::hierarchy::has_ancestor_component;
use crate::registry::Registry;

impl Registry {
    /// Serialize `entities` with every serializable component they hold.
    ///
    /// Listed entities without serializable components appear as `{}`.
    pub fn to_json(&self, entities: &[Entity]) -> Value {
        let mut doc = Map::new();
        for &entity in entities {
            let mut components = Map::new();
            for storage in self.storages.values() {
                if let Some(value) = storage.serialize(entity) {
                    components.insert(storage.type_name().to_string(), value);
                }
            }
            doc.insert(entity.id().to_string(), Value::Object(components));
        }
        Value::Object(doc)
    }

    /// Load a scene document, returning the loaded handles in order.
    ///
    /// Every key must be a positive, non-retired handle and every component
    /// name must be registered. Components are decoded into copies of the
    /// affected storages, which replace the live ones only once the whole
    /// document has decoded; on error the registry is left untouched.
    pub fn from_json(&mut self, doc: &Value) -> Result<Vec<Entity>, RegistryError> {
        let entries = self.validate(doc)?;

        let mut staged: HashMap<ComponentTypeId, Box<dyn TypedStorage>> = HashMap::new();
        for &(entity, components) in &entries {
            for (type_name, fields) in components {
                let id = self.resolve(type_name)?;
                let storage = match staged.entry(id) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(match self.storages.get(&id) {
                        Some(live) => live.clone_storage(),
                        None => self.factory().create(type_name)?,
                    }),
                };
                storage.unserialize(entity, fields)?;
            }
        }

        self.storages.extend(staged);
        let mut loaded: Vec<Entity> = entries.into_iter().map(|(entity, _)| entity).collect();
        for &entity in &loaded {
            self.reserve(entity);
        }
        loaded.sort_unstable();
        Ok(loaded)
    }

    fn validate<'a>(
        &self,
        doc: &'a Value,
    ) -> Result<Vec<(Entity, &'a Map<String, Value>)>, RegistryError> {
        let Value::Object(entities) = doc else {
            return Err(RegistryError::InvalidDocument(
                "top level must be an object".to_string(),
            ));
        };

        let mut entries = Vec::with_capacity(entities.len());
        for (key, components) in entities {
            let entity = key
                .parse::<Entity>()
                .ok()
                .filter(|entity| entity.is_valid())
                .ok_or_else(|| RegistryError::InvalidHandle(key.clone()))?;
            if self.is_retired(entity) {
                return Err(RegistryError::StaleHandle(entity));
            }
            let Value::Object(components) = components else {
                return Err(RegistryError::InvalidDocument(format!(
                    "{entity} must map to an object"
                )));
            };
            for type_name in components.keys() {
                self.resolve(type_name)?;
            }
            entries.push((entity, components));
        }
        Ok(entries)
    }
}

/// Entities that belong in a saved scene.
///
/// Skips runtime-scoped entities (`Info.scope != 0`), prototype subtrees
/// (a [`Proto`] on the entity or an ancestor), and everything below a
/// [`Ref`], which is rebuilt from the referenced prototype on load.
pub fn persistable_entities(registry: &Registry) -> Vec<Entity> {
    registry
        .entities()
        .into_keys()
        .filter(|&entity| {
            registry
                .get_ptr::<Info>(entity)
                .is_none_or(|info| info.scope == 0)
        })
        .filter(|&entity| !has_ancestor_component::<Proto>(registry, entity, true))
        .filter(|&entity| !has_ancestor_component::<Ref>(registry, entity, false))
        .collect()
}

/// Write the persistable entities of `registry` to `path` as pretty JSON.
pub fn save_scene(registry: &Registry, path: impl AsRef<Path>) -> Result<usize, SceneError> {
    let path = path.as_ref();
    let entities = persistable_entities(registry);
    let doc = registry.to_json(&entities);
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    info!(path = %path.display(), entities = entities.len(), "saved scene");
    Ok(entities.len())
}

/// Load the scene at `path` into `registry`.
pub fn load_scene(
    registry: &mut Registry,
    path: impl AsRef<Path>,
) -> Result<Vec<Entity>, SceneError> {
    let path = path.as_ref();
    let doc: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    let loaded = registry.from_json(&doc)?;
    info!(path = %path.display(), entities = loaded.len(), "loaded scene");
    Ok(loaded)
}

/// Encode a scene document as MessagePack.
pub fn to_msgpack(doc: &Value) -> Result<Vec<u8>, SceneError> {
    Ok(rmp_serde::to_vec_named(doc)?)
}

/// Decode a MessagePack snapshot back into a scene document.
pub fn from_msgpack(bytes: &[u8]) -> Result<Value, SceneError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
