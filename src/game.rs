//! Session state and the per-frame update pipeline.
//!
//! [`World`] is the single owned aggregate every pass mutates through `&mut`;
//! [`Game`] wraps it with timing, pause and restart. Order per tick:
//! movement, AI, combat, ammo/reload, spawning, particles.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use crate::config::{Difficulty, EngineConfig};
use crate::entities::{Effects, Enemy, IdAllocator, Item, Particle, Player};
use crate::events::{EventSink, GameEvent};
use crate::input::FrameInput;
use crate::map::{GridMap, ARENA_SPAWN};
use crate::physics::Vec2;
use crate::spawn::Spawner;
use crate::{ai, combat, movement};

pub const DEFAULT_VIEWPORT: (u32, u32) = (640, 400);

#[derive(Clone, Debug)]
pub struct World {
    pub map: GridMap,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub items: Vec<Item>,
    pub particles: Vec<Particle>,
    pub effects: Effects,
    pub stats: SessionStats,
    pub ids: IdAllocator,
    pub rng: ChaCha8Rng,
}

impl World {
    pub fn new(map: GridMap, spawn: Vec2, config: &EngineConfig, seed: u64) -> Self {
        Self {
            map,
            player: Player::new(spawn, config),
            enemies: Vec::with_capacity(config.enemy.population_cap),
            items: Vec::new(),
            particles: Vec::with_capacity(config.sim.max_particles),
            effects: Effects::default(),
            stats: SessionStats::default(),
            ids: IdAllocator::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub score: u32,
    pub kills: u32,
    pub shots_fired: u32,
    pub hits: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Paused,
    PlayerDead,
}

/// Serializable summary of a session, for the page and for debugging
#[derive(Clone, Debug, Serialize)]
pub struct WorldSnapshot {
    pub session: u64,
    pub x: f64,
    pub y: f64,
    pub health: i32,
    pub clip: u32,
    pub reserve: u32,
    pub reloading: bool,
    pub enemies: usize,
    pub items: usize,
    pub particles: usize,
    #[serde(flatten)]
    pub stats: SessionStats,
}

pub struct Game {
    config: EngineConfig,
    difficulty: Difficulty,
    map: GridMap,
    spawn: Vec2,
    seed: u64,
    session: u64,
    world: World,
    spawner: Spawner,
    paused: bool,
    last_tick: Option<f64>,
    viewport: (u32, u32),
}

impl Game {
    pub fn new(
        map: GridMap,
        spawn: Vec2,
        config: EngineConfig,
        difficulty: Difficulty,
        seed: u64,
    ) -> Self {
        let mut world = World::new(map.clone(), spawn, &config, seed);
        let mut spawner = Spawner::new();
        spawner.populate(&mut world, &config);
        info!(?difficulty, seed, "new session");
        Self {
            config,
            difficulty,
            map,
            spawn,
            seed,
            session: 0,
            world,
            spawner,
            paused: false,
            last_tick: None,
            viewport: DEFAULT_VIEWPORT,
        }
    }

    /// Built-in arena with default tunables
    pub fn arena(difficulty: Difficulty, seed: u64) -> Self {
        Self::new(
            GridMap::arena(),
            ARENA_SPAWN,
            EngineConfig::default(),
            difficulty,
            seed,
        )
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct mutable access, for scripted setups and tests
    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[inline]
    pub fn session(&self) -> u64 {
        self.session
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Screen size used for hit-scan vertical projection
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Throw the session away and rebuild it from initial conditions
    pub fn restart(&mut self) {
        self.session += 1;
        let seed = self.seed.wrapping_add(self.session);
        self.world = World::new(self.map.clone(), self.spawn, &self.config, seed);
        self.spawner = Spawner::new();
        self.spawner.populate(&mut self.world, &self.config);
        self.paused = false;
        info!(session = self.session, "session restarted");
    }

    /// Advance one frame at timestamp `now` (ms, monotonic)
    pub fn tick<S: EventSink>(&mut self, now: f64, input: &FrameInput, sink: &mut S) -> TickOutcome {
        let dt = match self.last_tick {
            Some(prev) => ((now - prev) / 1000.0).clamp(0.0, self.config.sim.max_dt),
            None => 0.0,
        };
        // Always advance so resuming from pause does not produce a long step
        self.last_tick = Some(now);

        if self.paused {
            return TickOutcome::Paused;
        }
        if !self.world.player.is_alive() {
            return TickOutcome::PlayerDead;
        }

        let profile = self.difficulty.profile();
        let config = &self.config;
        let world = &mut self.world;

        movement::update(world, config, input, now, dt, sink);
        ai::update(world, config, profile, now, dt, sink);

        if input.fire {
            combat::fire(world, config, self.viewport, now, sink);
        }
        if input.reload && world.player.weapon.request_reload(now, world.player.is_alive()) {
            sink.emit(GameEvent::Reload);
        }
        if let Some(rounds) = world.player.weapon.update(now) {
            sink.emit(GameEvent::ReloadComplete { rounds });
        }

        self.spawner.update(world, config, now);
        world.particles.retain_mut(|p| p.step(dt));

        if !world.player.is_alive() {
            info!(
                score = world.stats.score,
                kills = world.stats.kills,
                "player died"
            );
            sink.emit(GameEvent::PlayerDied);
            return TickOutcome::PlayerDead;
        }
        TickOutcome::Running
    }

    /// Callback for an external reload timer. Completes a due reload of the
    /// matching session; stale or repeated calls are no-ops, and so are calls
    /// while paused (the next running tick finishes the reload).
    pub fn on_reload_timer<S: EventSink>(&mut self, session: u64, now: f64, sink: &mut S) -> bool {
        if session != self.session || self.paused {
            return false;
        }
        match self.world.player.weapon.update(now) {
            Some(rounds) => {
                sink.emit(GameEvent::ReloadComplete { rounds });
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let w = &self.world;
        WorldSnapshot {
            session: self.session,
            x: w.player.pos.x,
            y: w.player.pos.y,
            health: w.player.health(),
            clip: w.player.weapon.clip(),
            reserve: w.player.weapon.reserve(),
            reloading: w.player.weapon.is_reloading(),
            enemies: w.enemies.len(),
            items: w.items.len(),
            particles: w.particles.len(),
            stats: w.stats,
        }
    }
}
