//! # engine_app — demo
//!
//! Builds a small scene in a host engine, plays it through a hot-reloadable
//! game module, and saves the host scene.
//!
//! ## Environment
//!
//! - `ENGINE_CYCLE_RATE`, `ENGINE_MAX_CYCLES` — see [`EngineConfig`].
//! - `ENGINE_SCENE_PATH` — where to write the saved scene; printed to
//!   stdout when unset.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_app::{
    Engine, EngineConfig, GameInstance, ModuleHost, PrototypeSystem, System, TransformSystem,
    component_factory,
};
use engine_ecs::{Info, Proto, Ref, Relation, add_children, persistable_entities, save_scene};
use engine_math::{Transform, Vec3};

/// Cycles the demo plays when `ENGINE_MAX_CYCLES` is 0.
const DEMO_CYCLES: u64 = 120;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let config = EngineConfig::from_env();
    let mut host = Engine::new(Arc::new(component_factory()?));
    build_scene(&mut host)?;
    info!(entities = host.registry().entities().len(), "scene built");

    let mut modules = ModuleHost::new(Box::new(GameInstance::new(|| {
        vec![
            Box::new(PrototypeSystem) as Box<dyn System>,
            Box::new(TransformSystem),
        ]
    })));
    modules.init(&host)?;
    modules.start(&host)?;
    modules.resize(1280, 720)?;

    let cycles = if config.max_cycles == 0 {
        DEMO_CYCLES
    } else {
        config.max_cycles
    };
    let budget = std::time::Duration::from_secs_f64(config.cycle_budget());
    for _ in 0..cycles {
        modules.update()?;
        std::thread::sleep(budget);
    }
    modules.shutdown();
    info!(cycles, "game session finished");

    match std::env::var("ENGINE_SCENE_PATH") {
        Ok(path) => {
            save_scene(host.registry(), &path)?;
        }
        Err(_) => {
            let doc = host
                .registry()
                .to_json(&persistable_entities(host.registry()));
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}

/// A prototype tree and two references to it under a scene root.
fn build_scene(host: &mut Engine) -> Result<()> {
    let registry = host.registry_mut();

    let tree = registry.create_entity((
        Info {
            name: "tree".into(),
            ..Info::default()
        },
        Proto {
            path: "models/tree.glb".into(),
        },
        Relation::default(),
        Transform::default(),
    ))?;
    let crown = registry.create_entity((
        Info {
            name: "crown".into(),
            ..Info::default()
        },
        Relation::default(),
        Transform::from_position(Vec3::new(0.0, 3.0, 0.0)),
    ))?;
    add_children(registry, tree, &[crown])?;

    let root = registry.create_entity((
        Info {
            name: "forest".into(),
            ..Info::default()
        },
        Relation::default(),
        Transform::default(),
    ))?;
    let mut placed = Vec::new();
    for x in [-4.0, 4.0] {
        placed.push(registry.create_entity((
            Info {
                name: format!("tree@{x}"),
                ..Info::default()
            },
            Ref {
                path: "models/tree.glb".into(),
            },
            Relation::default(),
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
        ))?);
    }
    add_children(registry, root, &placed)?;
    Ok(())
}
