//! Hot-reload module boundary.
//!
//! A game module owns its own [`Engine`] and registry, seeded from the host
//! (editor) engine with [`Registry::copy_from`] when play starts. The host
//! only talks to it through [`GameModule`], so a rebuilt module can be
//! swapped in by [`ModuleHost::reload`] without touching the host registry.

use anyhow::{Context, Result};
use engine_component::{Component, Entity};
use engine_ecs::{Info, Registry};
use tracing::info;
use uuid::Uuid;

use crate::engine::Engine;
use crate::system::System;

/// The lifecycle a reloadable game module exposes to its host.
pub trait GameModule {
    /// Prepare a fresh engine. The host registry is not copied yet.
    fn init_game(&mut self, host: &Engine) -> Result<()>;

    /// Drop the module's engine and everything in it.
    fn destroy_game(&mut self);

    /// Begin or resume play. The first start after init copies the host
    /// registry and starts the module's systems.
    fn start_game(&mut self, host: &Engine) -> Result<()>;

    /// End play and drop the engine; the next start begins from the host again.
    fn stop_game(&mut self);

    fn pause_game(&mut self);

    /// Run one cycle if playing.
    fn update_game(&mut self) -> Result<()>;

    fn resize_game(&mut self, width: u32, height: u32) -> Result<()>;

    /// Texture the module renders into, if any.
    fn texture_handle(&self) -> Option<u64>;
}

/// Output surface of a running game. Runtime-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Filled in by whatever renders into the viewport.
    pub texture: Option<u64>,
}

impl Component for Viewport {
    fn type_name() -> &'static str {
        "Viewport"
    }
}

type SystemsBuilder = Box<dyn Fn() -> Vec<Box<dyn System>>>;

/// The standard [`GameModule`]: an engine with a fixed set of systems.
pub struct GameInstance {
    build_systems: SystemsBuilder,
    engine: Option<Engine>,
    started: bool,
    paused: bool,
    viewport: Entity,
}

impl std::fmt::Debug for GameInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameInstance")
            .field("engine", &self.engine)
            .field("started", &self.started)
            .field("paused", &self.paused)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl GameInstance {
    /// `build_systems` is called on every init to produce the module's systems.
    pub fn new(build_systems: impl Fn() -> Vec<Box<dyn System>> + 'static) -> Self {
        Self {
            build_systems: Box::new(build_systems),
            engine: None,
            started: false,
            paused: false,
            viewport: Entity::INVALID,
        }
    }

    #[must_use]
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.engine.is_some() && self.started && !self.paused
    }

    /// The runtime entity holding the [`Viewport`], once started.
    #[must_use]
    pub fn viewport(&self) -> Entity {
        self.viewport
    }

    fn registry(&self) -> Option<&Registry> {
        self.engine.as_ref().map(Engine::registry)
    }
}

impl GameModule for GameInstance {
    fn init_game(&mut self, host: &Engine) -> Result<()> {
        let mut engine = Engine::new(host.registry().factory().clone());
        for system in (self.build_systems)() {
            engine.add_system(system);
        }
        self.engine = Some(engine);
        self.started = false;
        self.paused = false;
        info!("game initialized");
        Ok(())
    }

    fn destroy_game(&mut self) {
        self.engine = None;
        self.started = false;
    }

    fn start_game(&mut self, host: &Engine) -> Result<()> {
        if self.engine.is_none() {
            self.init_game(host)?;
        }
        if !self.started {
            let engine = self.engine.as_mut().context("game engine missing after init")?;
            engine.registry_mut().copy_from(host.registry());
            self.viewport = engine.registry_mut().create_entity((
                Info {
                    name: "Game".to_string(),
                    scope: 1,
                    active: true,
                },
                Viewport::default(),
            ))?;
            engine.start()?;
            self.started = true;
            info!(viewport = %self.viewport, "game started");
        }
        self.paused = false;
        Ok(())
    }

    fn stop_game(&mut self) {
        self.engine = None;
        self.started = false;
        self.paused = false;
        info!("game stopped");
    }

    fn pause_game(&mut self) {
        self.paused = true;
    }

    fn update_game(&mut self) -> Result<()> {
        if !self.started || self.paused {
            return Ok(());
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.run_cycle()?;
        }
        Ok(())
    }

    fn resize_game(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        if let Some(engine) = self.engine.as_mut() {
            let viewport = engine.registry_mut().get::<Viewport>(self.viewport)?;
            viewport.width = width;
            viewport.height = height;
        }
        Ok(())
    }

    fn texture_handle(&self) -> Option<u64> {
        self.registry()?.get_ptr::<Viewport>(self.viewport)?.texture
    }
}

/// Where a hosted module is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Unloaded,
    Stopped,
    Running,
    Paused,
}

/// Drives a [`GameModule`] on behalf of the host and swaps it on reload.
pub struct ModuleHost {
    module: Box<dyn GameModule>,
    state: ModuleState,
    session: Uuid,
    generation: u32,
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ModuleHost {
    pub fn new(module: Box<dyn GameModule>) -> Self {
        Self {
            module,
            state: ModuleState::Unloaded,
            session: Uuid::new_v4(),
            generation: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Identifies the currently loaded module in logs; changes on reload.
    #[must_use]
    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Number of reloads so far.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn init(&mut self, host: &Engine) -> Result<()> {
        self.module.init_game(host)?;
        self.state = ModuleState::Stopped;
        info!(session = %self.session, generation = self.generation, "module loaded");
        Ok(())
    }

    pub fn start(&mut self, host: &Engine) -> Result<()> {
        self.module.start_game(host)?;
        self.state = ModuleState::Running;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == ModuleState::Running {
            self.module.pause_game();
            self.state = ModuleState::Paused;
        }
    }

    pub fn stop(&mut self) {
        if matches!(self.state, ModuleState::Running | ModuleState::Paused) {
            self.module.stop_game();
            self.state = ModuleState::Stopped;
        }
    }

    pub fn update(&mut self) -> Result<()> {
        if self.state == ModuleState::Running {
            self.module.update_game()?;
        }
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.module.resize_game(width, height)
    }

    #[must_use]
    pub fn texture_handle(&self) -> Option<u64> {
        self.module.texture_handle()
    }

    /// Swap in a rebuilt module.
    ///
    /// The old module is stopped and destroyed, the new one initialised, and
    /// play restarted from the host registry if it was running or paused.
    pub fn reload(&mut self, host: &Engine, module: Box<dyn GameModule>) -> Result<()> {
        let previous = self.state;
        self.stop();
        if self.state != ModuleState::Unloaded {
            self.module.destroy_game();
        }

        self.module = module;
        self.generation += 1;
        self.session = Uuid::new_v4();
        self.state = ModuleState::Unloaded;
        info!(session = %self.session, generation = self.generation, "module reloaded");

        self.init(host).context("reloaded module failed to initialise")?;
        if matches!(previous, ModuleState::Running | ModuleState::Paused) {
            self.start(host)?;
            if previous == ModuleState::Paused {
                self.pause();
            }
        }
        Ok(())
    }

    /// Stop and destroy the module.
    pub fn shutdown(&mut self) {
        self.stop();
        if self.state != ModuleState::Unloaded {
            self.module.destroy_game();
            self.state = ModuleState::Unloaded;
        }
    }
}
