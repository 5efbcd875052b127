//! The system contract.

use anyhow::Result;
use engine_ecs::Registry;

/// A unit of per-cycle behaviour over a registry.
///
/// Systems never delete entities directly; they [`Registry::release`] them
/// and the engine cleans up once every system has run.
pub trait System {
    /// Human-readable name, used in logs and by
    /// [`Engine::remove_system`](crate::Engine::remove_system).
    fn name(&self) -> &str;

    /// Called once by [`Engine::start`](crate::Engine::start).
    fn start(&mut self, _registry: &mut Registry) -> Result<()> {
        Ok(())
    }

    /// Called once per cycle.
    fn process(&mut self, registry: &mut Registry) -> Result<()>;
}
