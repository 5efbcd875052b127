//! The processing cycle.
//!
//! One cycle runs every system's `process` in registration order and then
//! cleans up released entities exactly once, so every system in a cycle sees
//! the same set of zombies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use engine_component::ComponentFactory;
use engine_ecs::Registry;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::system::System;

/// A registry plus the ordered systems that run over it.
pub struct Engine {
    registry: Registry,
    systems: Vec<Box<dyn System>>,
    cycle: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("systems", &self.system_names())
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn new(factory: Arc<ComponentFactory>) -> Self {
        Self {
            registry: Registry::new(factory),
            systems: Vec::new(),
            cycle: 0,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Number of completed cycles.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Append a system; systems run in the order they were added.
    pub fn add_system(&mut self, system: Box<dyn System>) {
        debug!(system = system.name(), "added system");
        self.systems.push(system);
    }

    /// Remove and return the first system called `name`.
    pub fn remove_system(&mut self, name: &str) -> Option<Box<dyn System>> {
        let index = self.systems.iter().position(|s| s.name() == name)?;
        Some(self.systems.remove(index))
    }

    #[must_use]
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Call every system's `start`.
    pub fn start(&mut self) -> Result<()> {
        for system in &mut self.systems {
            system
                .start(&mut self.registry)
                .with_context(|| format!("system {} failed to start", system.name()))?;
        }
        info!(systems = self.systems.len(), "engine started");
        Ok(())
    }

    /// Run one cycle. Returns the number of entities cleaned up.
    pub fn run_cycle(&mut self) -> Result<usize> {
        for system in &mut self.systems {
            system
                .process(&mut self.registry)
                .with_context(|| {
                    format!("system {} failed in cycle {}", system.name(), self.cycle)
                })?;
        }
        let removed = self.registry.clean_up();
        self.cycle += 1;
        Ok(removed)
    }

    /// Run cycles at `config.cycle_rate` until `config.max_cycles` is
    /// reached, or forever when it is 0.
    pub fn run(&mut self, config: &EngineConfig) -> Result<()> {
        let budget = Duration::from_secs_f64(config.cycle_budget());
        let mut count = 0u64;

        info!(
            cycle_rate = config.cycle_rate,
            max_cycles = config.max_cycles,
            "starting cycle loop"
        );

        loop {
            let start = Instant::now();
            self.run_cycle()?;

            count += 1;
            if config.max_cycles > 0 && count >= config.max_cycles {
                info!(cycles = count, "cycle loop complete");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            } else {
                warn!(
                    cycle = self.cycle,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "cycle exceeded time budget"
                );
            }
        }
    }
}
