//! Component bundles for [`Registry::create_entity`](crate::Registry::create_entity).

use engine_component::{Component, Entity};

use crate::error::RegistryError;
use crate::registry::Registry;

/// A tuple of 1 to 8 components attached together to a new entity.
pub trait Bundle {
    /// Attach every component to `entity`.
    fn insert(self, registry: &mut Registry, entity: Entity) -> Result<(), RegistryError>;

    /// Component type names in tuple order.
    fn type_names() -> Vec<&'static str>;
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            #[allow(non_snake_case)]
            fn insert(self, registry: &mut Registry, entity: Entity) -> Result<(), RegistryError> {
                let ($($name,)+) = self;
                $(registry.add_component(entity, $name)?;)+
                Ok(())
            }

            fn type_names() -> Vec<&'static str> {
                vec![$($name::type_name()),+]
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Info, Instance, Relation};
    use crate::registry::tests::{Health, Tag, registry};

    #[test]
    fn test_type_names_follow_tuple_order() {
        assert_eq!(<(Tag, Health)>::type_names(), vec!["Tag", "Health"]);
    }

    #[test]
    fn test_large_bundle() {
        let mut reg = registry();
        let e = reg
            .create_entity((
                Info::default(),
                Instance,
                Relation::default(),
                Health { current: 2.0 },
                Tag,
            ))
            .unwrap();
        assert_eq!(reg.entities()[&e].components.len(), 5);
    }
}
