//! # engine_app
//!
//! The runtime around the registry: the per-cycle system loop, built-in
//! systems, and the contract a hot-reloadable game module implements.

pub mod config;
pub mod engine;
pub mod module;
pub mod system;
pub mod systems;

pub use config::EngineConfig;
pub use engine::Engine;
pub use module::{GameInstance, GameModule, ModuleHost, ModuleState, Viewport};
pub use system::System;
pub use systems::{PrototypeSystem, TransformSystem};

use engine_component::{ComponentError, ComponentFactory};

/// The core component table plus the runtime-only components of this crate.
pub fn component_factory() -> Result<ComponentFactory, ComponentError> {
    let mut factory = engine_ecs::register_all_components()?;
    factory.register::<Viewport>()?;
    Ok(factory)
}
