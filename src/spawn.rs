//! Enemy population: the initial wave and cooldown-gated respawns.

use rand::Rng;
use tracing::debug;

use crate::config::EngineConfig;
use crate::entities::{Enemy, EnemyKind, EntityId};
use crate::game::World;

/// Random cells tried per spawn before giving up for this frame
const SPAWN_ATTEMPTS: usize = 32;

#[derive(Clone, Debug, Default)]
pub struct Spawner {
    last_spawn_at: Option<f64>,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the session's starting enemies. The respawn cooldown starts at
    /// the first [`Spawner::update`], on the caller's clock.
    pub fn populate(&mut self, world: &mut World, config: &EngineConfig) {
        let count = config.enemy.initial_count.min(config.enemy.population_cap);
        for _ in 0..count {
            if spawn_one(world, config).is_none() {
                break;
            }
        }
        self.last_spawn_at = None;
    }

    /// Spawn at most one enemy if below the cap and off cooldown
    pub fn update(&mut self, world: &mut World, config: &EngineConfig, now: f64) -> Option<EntityId> {
        let cfg = &config.enemy;
        let Some(last) = self.last_spawn_at else {
            self.last_spawn_at = Some(now);
            return None;
        };
        if world.enemies.len() >= cfg.population_cap || now - last < cfg.spawn_cooldown_ms {
            return None;
        }
        let id = spawn_one(world, config)?;
        self.last_spawn_at = Some(now);
        Some(id)
    }
}

fn spawn_one(world: &mut World, config: &EngineConfig) -> Option<EntityId> {
    let cfg = &config.enemy;
    let pos = world.map.random_open_cell(
        &mut world.rng,
        world.player.pos,
        cfg.spawn_min_distance,
        SPAWN_ATTEMPTS,
    )?;
    let kind = if world.rng.gen_bool(cfg.elite_chance.clamp(0.0, 1.0)) {
        EnemyKind::Elite
    } else {
        EnemyKind::Basic
    };
    let id = world.ids.next_id();
    world.enemies.push(Enemy::new(id, pos, kind, cfg));
    debug!(id, ?kind, x = pos.x, y = pos.y, "enemy spawned");
    Some(id)
}
