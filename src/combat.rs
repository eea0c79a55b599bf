//! Hit-scan shooting: trigger gating, target acquisition along the aim ray,
//! screen-space head/body resolution, damage, kills and drops.

use std::f64::consts::TAU;

use rand::Rng;
use tracing::debug;

use crate::config::EngineConfig;
use crate::entities::{EnemyState, EntityId, Item, ItemKind, Particle};
use crate::events::{EventSink, GameEvent};
use crate::game::World;
use crate::physics::{raycast_dda, Vec2};
use crate::render::{Anchor, Camera};
use crate::texture;
use crate::weapon::TriggerPull;

const HIT_PARTICLES: usize = 4;
const KILL_PARTICLES: usize = 12;
const SPARK_PARTICLES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Dead player or weapon busy reloading
    Ignored,
    DryFire,
    Miss,
    Hit { id: EntityId, headshot: bool },
    Kill { id: EntityId, headshot: bool },
}

/// Resolve one trigger pull. `viewport` is the screen the aim point lives
/// on; the aim point is its centre.
pub fn fire<S: EventSink>(
    world: &mut World,
    config: &EngineConfig,
    viewport: (u32, u32),
    now: f64,
    sink: &mut S,
) -> ShotOutcome {
    let cfg = &config.combat;
    if !world.player.is_alive() {
        return ShotOutcome::Ignored;
    }

    match world.player.weapon.pull_trigger() {
        TriggerPull::Busy => return ShotOutcome::Ignored,
        TriggerPull::DryFire => {
            sink.emit(GameEvent::DryFire);
            if world.player.weapon.request_reload(now, true) {
                sink.emit(GameEvent::Reload);
            }
            return ShotOutcome::DryFire;
        }
        TriggerPull::Fired { emptied } => {
            sink.emit(GameEvent::Shoot);
            world.stats.shots_fired += 1;
            world.effects.recoil += cfg.recoil_impulse;
            world.effects.muzzle_flash_until = now + cfg.muzzle_flash_ms;
            if emptied && world.player.weapon.request_reload(now, true) {
                sink.emit(GameEvent::Reload);
            }
        }
    }

    let Some((index, headshot)) = acquire(world, config, viewport) else {
        ricochet(world, config);
        return ShotOutcome::Miss;
    };

    world.stats.hits += 1;
    world.effects.hit_marker_until = now + cfg.hit_marker_ms;
    if headshot {
        world.effects.headshot_until = now + cfg.headshot_ms;
    }

    let damage = if headshot {
        cfg.head_damage
    } else {
        cfg.body_damage
    };
    let enemy = &mut world.enemies[index];
    enemy.damage(damage);
    let (id, pos) = (enemy.id, enemy.pos);

    if enemy.is_alive() {
        enemy.state = EnemyState::Chase;
        sink.emit(GameEvent::Hit { headshot });
        burst(world, config, pos, texture::PARTICLE_BLOOD, HIT_PARTICLES);
        return ShotOutcome::Hit { id, headshot };
    }

    world.enemies.swap_remove(index);
    world.stats.kills += 1;
    world.stats.score += if headshot {
        cfg.headshot_kill_score
    } else {
        cfg.kill_score
    };
    let kind = if world.rng.gen_bool(0.5) {
        ItemKind::Health
    } else {
        ItemKind::Ammo
    };
    let item_id = world.ids.next_id();
    world.items.push(Item {
        id: item_id,
        pos,
        kind,
        spawned_at: now,
    });
    burst(world, config, pos, texture::PARTICLE_BLOOD, KILL_PARTICLES);
    debug!(id, headshot, ?kind, "enemy killed");
    sink.emit(GameEvent::Kill { headshot });
    ShotOutcome::Kill { id, headshot }
}

/// Nearest live enemy on the aim ray whose projected sprite covers the aim
/// point. Returns its index and whether the aim point is in the head band.
fn acquire(world: &World, config: &EngineConfig, viewport: (u32, u32)) -> Option<(usize, bool)> {
    let cfg = &config.combat;
    let player = &world.player;
    let dir = player.dir;

    let (index, _) = world
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_alive())
        .filter_map(|(i, e)| {
            let rel = e.pos.sub(&player.pos);
            let forward = rel.dot(&dir);
            let deviation = rel.cross(&dir).abs();
            let dist = rel.length();
            (forward > 0.0
                && deviation < cfg.hit_width
                && dist <= cfg.max_range
                && world.map.has_line_of_sight(player.pos, e.pos))
            .then_some((i, dist))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    // Only the nearest candidate is tested; a vertical miss does not pass
    // through to whatever stands behind it.
    let (width, height) = viewport;
    let camera = Camera::new(world, width, height);
    let (_, depth) = camera.to_camera_space(world.enemies[index].pos)?;
    if depth <= 0.0 {
        return None;
    }
    let (top, bottom) = camera.sprite_span(depth, 1.0, Anchor::Center);
    let aim = height as f64 / 2.0;
    if aim < top || aim > bottom {
        return None;
    }
    let headshot = aim < top + (bottom - top) * cfg.head_fraction;
    Some((index, headshot))
}

/// Sparks where a missed shot meets the first wall along the view ray
fn ricochet(world: &mut World, config: &EngineConfig) {
    let (origin, dir) = (world.player.pos, world.player.dir);
    let map = &world.map;
    let Some(hit) = raycast_dda(origin, dir, config.combat.max_range, |x, y| map.is_solid(x, y))
    else {
        return;
    };
    let pos = origin.add(&dir.scale((hit.distance - 0.05).max(0.0)));
    burst(world, config, pos, texture::PARTICLE_SPARK, SPARK_PARTICLES);
}

fn burst(world: &mut World, config: &EngineConfig, pos: Vec2, texture: u32, count: usize) {
    let room = config
        .sim
        .max_particles
        .saturating_sub(world.particles.len());
    for _ in 0..count.min(room) {
        let angle = world.rng.gen_range(0.0..TAU);
        let speed = world.rng.gen_range(0.5..2.0);
        let decay = world.rng.gen_range(1.5..3.0);
        world.particles.push(Particle {
            pos,
            vel: Vec2::new(angle.cos(), angle.sin()).scale(speed),
            texture,
            life: 1.0,
            decay,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Enemy, EnemyKind};
    use crate::events::NullSink;
    use crate::map::GridMap;
    use crate::weapon::Weapon;

    const VIEW: (u32, u32) = (640, 400);

    const HALL: &str = "
        111111111111
        1..........1
        1..........1
        1.....1....1
        111111111111
    ";

    fn setup(enemies: &[(Vec2, i32)]) -> (World, EngineConfig) {
        let config = EngineConfig::default();
        let mut world = World::new(GridMap::parse(HALL).unwrap(), Vec2::new(1.5, 2.5), &config, 9);
        world.player.face(Vec2::new(1.0, 0.0));
        for &(pos, health) in enemies {
            let id = world.ids.next_id();
            let mut enemy = Enemy::new(id, pos, EnemyKind::Basic, &config.enemy);
            enemy.health = health;
            world.enemies.push(enemy);
        }
        (world, config)
    }

    /// Pitch that puts the aim point inside the head band at `depth`
    fn head_pitch(depth: f64) -> f64 {
        0.375 * VIEW.1 as f64 / depth
    }

    #[test]
    fn test_body_damage_kills_at_exact_health() {
        let (mut world, config) = setup(&[(Vec2::new(5.5, 2.5), 40)]);
        let mut events = Vec::new();
        let outcome = fire(&mut world, &config, VIEW, 0.0, &mut events);
        assert_eq!(outcome, ShotOutcome::Kill { id: 0, headshot: false });
        assert!(world.enemies.is_empty());
        assert_eq!(world.items.len(), 1);
        assert_eq!(world.items[0].pos, Vec2::new(5.5, 2.5));
        assert_eq!(world.stats.score, config.combat.kill_score);
        assert_eq!(events, vec![GameEvent::Shoot, GameEvent::Kill { headshot: false }]);
    }

    #[test]
    fn test_one_over_body_damage_takes_two_hits() {
        let (mut world, config) = setup(&[(Vec2::new(5.5, 2.5), 41)]);
        let first = fire(&mut world, &config, VIEW, 0.0, &mut NullSink);
        assert_eq!(first, ShotOutcome::Hit { id: 0, headshot: false });
        assert_eq!(world.enemies[0].health, 1);
        assert_eq!(world.enemies[0].state, EnemyState::Chase);
        assert!(world.items.is_empty());
        // Effects from the first shot do not gate the second
        let second = fire(&mut world, &config, VIEW, 10.0, &mut NullSink);
        assert_eq!(second, ShotOutcome::Kill { id: 0, headshot: false });
        assert_eq!(world.stats.hits, 2);
        assert_eq!(world.stats.shots_fired, 2);
    }

    #[test]
    fn test_headshot_scores_more() {
        let (mut body, config) = setup(&[(Vec2::new(5.5, 2.5), 40)]);
        fire(&mut body, &config, VIEW, 0.0, &mut NullSink);

        let (mut head, _) = setup(&[(Vec2::new(5.5, 2.5), 40)]);
        head.player.pitch = head_pitch(4.0);
        let outcome = fire(&mut head, &config, VIEW, 0.0, &mut NullSink);
        assert_eq!(outcome, ShotOutcome::Kill { id: 0, headshot: true });
        assert!(head.stats.score > body.stats.score);
        assert!(head.effects.headshot(100.0));
    }

    #[test]
    fn test_aim_above_sprite_misses() {
        let (mut world, config) = setup(&[(Vec2::new(5.5, 2.5), 100)]);
        world.player.pitch = 150.0;
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut NullSink), ShotOutcome::Miss);
        assert_eq!(world.enemies[0].health, 100);
        assert_eq!(world.player.weapon.clip(), 11);
    }

    #[test]
    fn test_nearest_visible_candidate_wins() {
        let (mut world, config) = setup(&[
            (Vec2::new(8.5, 2.5), 100),
            (Vec2::new(4.5, 2.7), 100),
            (Vec2::new(3.5, 3.5), 100),
        ]);
        let outcome = fire(&mut world, &config, VIEW, 0.0, &mut NullSink);
        assert_eq!(outcome, ShotOutcome::Hit { id: 1, headshot: false });
        assert_eq!(world.enemies[0].health, 100);
        assert_eq!(world.enemies[2].health, 100);
    }

    #[test]
    fn test_behind_and_occluded_enemies_are_safe() {
        let (mut world, config) = setup(&[(Vec2::new(9.5, 3.5), 100)]);
        world.player.pos = Vec2::new(3.5, 3.5);
        // Wall at x=6 on row 3
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut NullSink), ShotOutcome::Miss);

        world.player.face(Vec2::new(-1.0, 0.0));
        world.enemies[0].pos = Vec2::new(5.5, 3.5);
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut NullSink), ShotOutcome::Miss);
        assert_eq!(world.enemies[0].health, 100);
    }

    #[test]
    fn test_last_round_triggers_reload_and_blocks_fire() {
        let (mut world, config) = setup(&[]);
        world.player.weapon = Weapon::with_ammo(&config.weapon, 1, 30);
        let mut events = Vec::new();
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut events), ShotOutcome::Miss);
        assert_eq!(events, vec![GameEvent::Shoot, GameEvent::Reload]);
        assert!(world.player.weapon.is_reloading());
        assert_eq!(fire(&mut world, &config, VIEW, 10.0, &mut events), ShotOutcome::Ignored);
        assert_eq!(world.stats.shots_fired, 1);
    }

    #[test]
    fn test_empty_clip_dry_fires_and_reloads() {
        let (mut world, config) = setup(&[(Vec2::new(5.5, 2.5), 40)]);
        world.player.weapon = Weapon::with_ammo(&config.weapon, 0, 30);
        let mut events = Vec::new();
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut events), ShotOutcome::DryFire);
        assert_eq!(events, vec![GameEvent::DryFire, GameEvent::Reload]);
        assert_eq!(world.enemies[0].health, 40);

        // Nothing in reserve either: dry fire only
        world.player.weapon = Weapon::with_ammo(&config.weapon, 0, 0);
        events.clear();
        fire(&mut world, &config, VIEW, 0.0, &mut events);
        assert_eq!(events, vec![GameEvent::DryFire]);
    }

    #[test]
    fn test_infinite_ammo_never_drains() {
        let mut config = EngineConfig::default();
        config.weapon.infinite_ammo = true;
        let mut world = World::new(GridMap::parse(HALL).unwrap(), Vec2::new(1.5, 2.5), &config, 9);
        for t in 0..20 {
            fire(&mut world, &config, VIEW, t as f64, &mut NullSink);
        }
        assert_eq!(world.player.weapon.clip(), 12);
        assert_eq!(world.stats.shots_fired, 20);
    }

    #[test]
    fn test_dead_player_cannot_fire() {
        let (mut world, config) = setup(&[(Vec2::new(5.5, 2.5), 40)]);
        world.player.damage(100);
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut NullSink), ShotOutcome::Ignored);
        assert_eq!(world.player.weapon.clip(), 12);
    }

    #[test]
    fn test_miss_sparks_on_wall() {
        let (mut world, config) = setup(&[]);
        assert_eq!(fire(&mut world, &config, VIEW, 0.0, &mut NullSink), ShotOutcome::Miss);
        assert_eq!(world.particles.len(), SPARK_PARTICLES);
        let spark = &world.particles[0];
        assert_eq!(spark.texture, texture::PARTICLE_SPARK);
        assert!((spark.pos.x - 10.95).abs() < 1e-9);
    }

    #[test]
    fn test_particles_capped() {
        let (mut world, mut config) = setup(&[(Vec2::new(5.5, 2.5), 1000)]);
        config.sim.max_particles = 6;
        fire(&mut world, &config, VIEW, 0.0, &mut NullSink);
        fire(&mut world, &config, VIEW, 1.0, &mut NullSink);
        assert_eq!(world.particles.len(), 6);
    }
}
