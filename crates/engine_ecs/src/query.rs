//! Run-time execution of [`QueryDescriptor`]s.

use engine_component::{ComponentTypeId, Entity, QueryDescriptor, TypedStorage};

use crate::error::RegistryError;
use crate::registry::Registry;

impl Registry {
    /// Entities holding every `with` type and none of the `without` types,
    /// in handle order.
    ///
    /// The smallest required storage drives the scan. An empty `with` list
    /// selects every live entity.
    pub fn query(&self, descriptor: &QueryDescriptor) -> Result<Vec<Entity>, RegistryError> {
        let with = self.resolve_all(&descriptor.with)?;
        let without = self.resolve_all(&descriptor.without)?;
        if descriptor.is_contradictory() {
            return Ok(Vec::new());
        }

        let excluded: Vec<&dyn TypedStorage> =
            without.iter().filter_map(|id| self.erased(id)).collect();
        let keep = |entity: &Entity| !excluded.iter().any(|storage| storage.has(*entity));

        if with.is_empty() {
            return Ok(self.entities().into_keys().filter(keep).collect());
        }

        let mut required = Vec::with_capacity(with.len());
        for id in &with {
            match self.erased(id) {
                Some(storage) => required.push(storage),
                None => return Ok(Vec::new()),
            }
        }
        required.sort_by_key(|storage| storage.len());
        let (driver, rest) = required.split_at(1);

        Ok(driver[0]
            .entities()
            .into_iter()
            .filter(|entity| rest.iter().all(|storage| storage.has(*entity)))
            .filter(keep)
            .collect())
    }

    fn resolve_all(&self, names: &[String]) -> Result<Vec<ComponentTypeId>, RegistryError> {
        names.iter().map(|name| self.resolve(name)).collect()
    }

    fn erased(&self, id: &ComponentTypeId) -> Option<&dyn TypedStorage> {
        self.storages.get(id).map(|storage| &**storage)
    }
}
