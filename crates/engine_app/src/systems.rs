//! Built-in systems.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use engine_component::{Entity, QueryDescriptor};
use engine_ecs::{Info, Instance, Proto, Ref, Registry, Relation, instantiate};
use engine_math::{Mat4, Transform};
use tracing::{debug, info};

use crate::system::System;

/// Propagates world matrices down [`Relation`] links into
/// [`Transform::parent_world`].
///
/// Parents are resolved before children regardless of handle order. A
/// parent without a `Transform` counts as the identity. In a relation cycle
/// the first repeated node is treated as a root.
#[derive(Debug, Default)]
pub struct TransformSystem;

struct Node {
    local: Mat4,
    parent: Entity,
}

impl System for TransformSystem {
    fn name(&self) -> &str {
        "transform"
    }

    fn process(&mut self, registry: &mut Registry) -> Result<()> {
        let mut nodes: HashMap<Entity, Node> = HashMap::new();
        registry.for_each::<Transform, _>(|entity, transform| {
            let parent = registry
                .get_ptr::<Relation>(entity)
                .map_or(Entity::INVALID, |relation| relation.parent);
            nodes.insert(
                entity,
                Node {
                    local: transform.matrix(),
                    parent,
                },
            );
        });

        let mut worlds: HashMap<Entity, Mat4> = HashMap::with_capacity(nodes.len());
        registry.each::<Transform, _>(|entity, transform| {
            transform.parent_world = nodes
                .get(&entity)
                .filter(|node| node.parent.is_valid())
                .map_or(Mat4::IDENTITY, |node| world_of(node.parent, &nodes, &mut worlds));
        });
        Ok(())
    }
}

fn world_of(
    entity: Entity,
    nodes: &HashMap<Entity, Node>,
    worlds: &mut HashMap<Entity, Mat4>,
) -> Mat4 {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = entity;
    let mut base = Mat4::IDENTITY;
    while current.is_valid() {
        if let Some(world) = worlds.get(&current) {
            base = *world;
            break;
        }
        let Some(node) = nodes.get(&current) else {
            break;
        };
        if !seen.insert(current) {
            break;
        }
        chain.push((current, node.local));
        current = node.parent;
    }
    for (node, local) in chain.into_iter().rev() {
        base *= local;
        worlds.insert(node, base);
    }
    base
}

/// Replaces [`Ref`] placeholders with instances of the matching loaded
/// [`Proto`].
///
/// A placeholder whose prototype is not in the registry is left alone until
/// one appears. Instantiated placeholders are tagged [`Instance`] and are not
/// visited again.
#[derive(Debug, Default)]
pub struct PrototypeSystem;

impl System for PrototypeSystem {
    fn name(&self) -> &str {
        "prototype"
    }

    fn process(&mut self, registry: &mut Registry) -> Result<()> {
        let pending = registry.query(&QueryDescriptor::new().with::<Ref>().without::<Instance>())?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut protos: HashMap<String, Entity> = HashMap::new();
        registry.each::<Proto, _>(|entity, proto| {
            protos.insert(proto.path.clone(), entity);
        });

        for entity in pending {
            let Some(path) = registry.get_ptr::<Ref>(entity).map(|r| r.path.clone()) else {
                continue;
            };
            let Some(&proto) = protos.get(&path) else {
                debug!(%entity, path = %path, "no prototype loaded for reference");
                continue;
            };
            instantiate(registry, proto, entity)?;
            registry.get::<Info>(entity)?.name = format!("Instance:{path}");
            info!(%entity, %proto, path = %path, "instantiated prototype");
        }
        Ok(())
    }
}
