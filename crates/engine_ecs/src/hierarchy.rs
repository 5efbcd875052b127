//! Parent/child helpers over [`Relation`] and prototype instantiation.
//!
//! Relations are plain data, so nothing stops a document from describing a
//! cycle. Every walk here keeps a visited set and stops at the first repeat.

use std::collections::HashSet;

use engine_component::{Component, Entity};
use tracing::warn;

use crate::components::{Info, Instance, Proto, Relation};
use crate::error::RegistryError;
use crate::registry::Registry;

/// Attach `children` under `parent`. Children that already have a parent
/// are left where they are.
pub fn add_children(
    registry: &mut Registry,
    parent: Entity,
    children: &[Entity],
) -> Result<(), RegistryError> {
    registry.get::<Relation>(parent)?;
    for &child in children {
        let relation = registry.get::<Relation>(child)?;
        if relation.parent.is_valid() {
            continue;
        }
        relation.parent = parent;
        registry.get::<Relation>(parent)?.add(child);
    }
    Ok(())
}

/// The chain of parents above `entity`, nearest first.
pub fn ancestors(registry: &Registry, entity: Entity) -> Vec<Entity> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([entity]);
    let mut current = entity;
    while let Some(relation) = registry.get_ptr::<Relation>(current) {
        let parent = relation.parent;
        if !parent.is_valid() || !seen.insert(parent) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Returns `true` if `entity` (when `include_self`) or any of its ancestors
/// holds a `T`.
pub fn has_ancestor_component<T: Component>(
    registry: &Registry,
    entity: Entity,
    include_self: bool,
) -> bool {
    (include_self && registry.has::<T>(entity))
        || ancestors(registry, entity)
            .into_iter()
            .any(|ancestor| registry.has::<T>(ancestor))
}

/// Copy the prototype subtree rooted at `source` onto `target`.
///
/// The copy is tagged [`Instance`], loses its [`Proto`], and is activated
/// while `source` is deactivated. Children are copied recursively under fresh
/// handles whose `parent` points at their new owner.
pub fn instantiate(
    registry: &mut Registry,
    source: Entity,
    target: Entity,
) -> Result<Entity, RegistryError> {
    let mut path = HashSet::new();
    instantiate_node(registry, source, target, &mut path)
}

fn instantiate_node(
    registry: &mut Registry,
    source: Entity,
    target: Entity,
    path: &mut HashSet<Entity>,
) -> Result<Entity, RegistryError> {
    path.insert(source);
    registry.copy(source, target)?;
    registry.add_component(target, Instance)?;
    registry.remove_component::<Proto>(target);
    registry.get::<Info>(target)?.active = true;
    registry.get::<Info>(source)?.active = false;

    if let Some(relation) = registry.get_cloned::<Relation>(target) {
        let mut copied = Relation {
            parent: relation.parent,
            children: Vec::with_capacity(relation.children.len()),
        };
        for child in relation.children {
            if path.contains(&child) {
                warn!(%source, %child, "relation cycle in prototype, child skipped");
                continue;
            }
            let copy = registry.next_entity_id();
            instantiate_node(registry, child, copy, path)?;
            registry.get::<Relation>(copy)?.parent = target;
            copied.add(copy);
        }
        registry.add_component(target, copied)?;
    }

    path.remove(&source);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Ref;
    use crate::registry::tests::{Health, registry};

    fn node(registry: &mut Registry, name: &str) -> Entity {
        registry
            .create_entity((
                Info {
                    name: name.into(),
                    ..Info::default()
                },
                Relation::default(),
            ))
            .unwrap()
    }

    #[test]
    fn test_add_children_keeps_existing_parent() {
        let mut reg = registry();
        let a = node(&mut reg, "a");
        let b = node(&mut reg, "b");
        let c = node(&mut reg, "c");
        add_children(&mut reg, a, &[c]).unwrap();
        add_children(&mut reg, b, &[c]).unwrap();

        assert_eq!(reg.get_ptr::<Relation>(a).unwrap().children, vec![c]);
        assert!(reg.get_ptr::<Relation>(b).unwrap().children.is_empty());
        assert_eq!(reg.get_ptr::<Relation>(c).unwrap().parent, a);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut reg = registry();
        let root = node(&mut reg, "root");
        let mid = node(&mut reg, "mid");
        let leaf = node(&mut reg, "leaf");
        add_children(&mut reg, root, &[mid]).unwrap();
        add_children(&mut reg, mid, &[leaf]).unwrap();

        assert_eq!(ancestors(&reg, leaf), vec![mid, root]);
        assert!(ancestors(&reg, root).is_empty());
    }

    #[test]
    fn test_ancestors_tolerates_cycles() {
        let mut reg = registry();
        let a = node(&mut reg, "a");
        let b = node(&mut reg, "b");
        reg.get::<Relation>(a).unwrap().parent = b;
        reg.get::<Relation>(b).unwrap().parent = a;

        assert_eq!(ancestors(&reg, a), vec![b]);
        assert!(!has_ancestor_component::<Ref>(&reg, a, true));
    }

    #[test]
    fn test_has_ancestor_component() {
        let mut reg = registry();
        let root = node(&mut reg, "root");
        let leaf = node(&mut reg, "leaf");
        add_children(&mut reg, root, &[leaf]).unwrap();
        reg.add_component(root, Proto::default()).unwrap();

        assert!(has_ancestor_component::<Proto>(&reg, leaf, false));
        assert!(has_ancestor_component::<Proto>(&reg, root, true));
        assert!(!has_ancestor_component::<Proto>(&reg, root, false));
    }

    #[test]
    fn test_instantiate_builds_independent_isomorphic_subtree() {
        let mut reg = registry();
        let proto = node(&mut reg, "tree");
        reg.add_component(
            proto,
            Proto {
                path: "tree.glb".into(),
            },
        )
        .unwrap();
        let trunk = node(&mut reg, "trunk");
        let leaf = node(&mut reg, "leaf");
        reg.add_component(leaf, Health { current: 1.0 }).unwrap();
        add_children(&mut reg, proto, &[trunk]).unwrap();
        add_children(&mut reg, trunk, &[leaf]).unwrap();

        let target = reg.next_entity_id();
        instantiate(&mut reg, proto, target).unwrap();

        assert!(reg.has::<Instance>(target));
        assert!(!reg.has::<Proto>(target));
        assert!(reg.get_ptr::<Info>(target).unwrap().active);
        assert!(!reg.get_ptr::<Info>(proto).unwrap().active);

        let copy_trunk = reg.get_ptr::<Relation>(target).unwrap().children[0];
        assert_ne!(copy_trunk, trunk);
        assert_eq!(reg.get_ptr::<Relation>(copy_trunk).unwrap().parent, target);
        assert_eq!(reg.get_ptr::<Info>(copy_trunk).unwrap().name, "trunk");

        let copy_leaf = reg.get_ptr::<Relation>(copy_trunk).unwrap().children[0];
        assert_ne!(copy_leaf, leaf);
        assert_eq!(reg.get_ptr::<Relation>(copy_leaf).unwrap().parent, copy_trunk);
        assert!(reg.get_ptr::<Relation>(copy_leaf).unwrap().children.is_empty());
        assert_eq!(reg.get_ptr::<Health>(copy_leaf), Some(&Health { current: 1.0 }));

        reg.get::<Health>(copy_leaf).unwrap().current = 0.0;
        assert_eq!(reg.get_ptr::<Health>(leaf).unwrap().current, 1.0);
        assert_eq!(reg.get_ptr::<Relation>(proto).unwrap().children, vec![trunk]);
        assert_eq!(reg.get_ptr::<Relation>(trunk).unwrap().parent, proto);
    }

    #[test]
    fn test_instantiate_skips_cyclic_children() {
        let mut reg = registry();
        let a = node(&mut reg, "a");
        let b = node(&mut reg, "b");
        reg.get::<Relation>(a).unwrap().children = vec![b];
        reg.get::<Relation>(b).unwrap().children = vec![a];

        let target = reg.next_entity_id();
        instantiate(&mut reg, a, target).unwrap();

        let copy_b = reg.get_ptr::<Relation>(target).unwrap().children[0];
        assert!(reg.get_ptr::<Relation>(copy_b).unwrap().children.is_empty());
    }
}
