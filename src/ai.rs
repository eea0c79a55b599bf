//! Enemy behavior: idle until the player is near and visible, then chase
//! and attack until dead.

use crate::config::{DifficultyProfile, EngineConfig};
use crate::entities::{Effects, EnemyState, Player};
use crate::events::{EventSink, GameEvent};
use crate::game::World;
use crate::physics::slide_move;

/// Length of the red screen flash after taking damage
pub const DAMAGE_FLASH_MS: f64 = 200.0;

pub fn update<S: EventSink>(
    world: &mut World,
    config: &EngineConfig,
    profile: DifficultyProfile,
    now: f64,
    dt: f64,
    sink: &mut S,
) {
    let cfg = &config.enemy;
    let World {
        map,
        player,
        enemies,
        effects,
        ..
    } = world;

    enemies.retain(|e| e.is_alive());

    for enemy in enemies.iter_mut() {
        if !player.is_alive() {
            break;
        }

        let mut dist = enemy.pos.distance_to(&player.pos);

        if enemy.state == EnemyState::Idle {
            if dist < cfg.aggro_radius && map.has_line_of_sight(enemy.pos, player.pos) {
                enemy.state = EnemyState::Chase;
            } else {
                continue;
            }
        }

        let to_player = player.pos.sub(&enemy.pos).normalize();
        enemy.dir = to_player;
        if dist > cfg.melee_range {
            let delta = to_player.scale(cfg.speed * dt);
            enemy.pos = slide_move(enemy.pos, delta, cfg.radius, |x, y| map.is_solid_at(x, y));
            enemy.anim_timer += dt;
            dist = enemy.pos.distance_to(&player.pos);
        }

        if dist <= cfg.melee_range {
            if now - enemy.last_melee_at >= cfg.melee_cooldown_ms {
                enemy.last_melee_at = now;
                hurt(player, effects, profile.melee_damage, now, sink);
            }
        } else if dist <= cfg.ranged_range
            && now - enemy.last_ranged_at >= profile.ranged_cooldown_ms
            && map.has_line_of_sight(enemy.pos, player.pos)
        {
            enemy.last_ranged_at = now;
            hurt(player, effects, profile.ranged_damage, now, sink);
        }
    }
}

fn hurt<S: EventSink>(player: &mut Player, effects: &mut Effects, amount: i32, now: f64, sink: &mut S) {
    let lost = player.damage(amount);
    if lost > 0 {
        effects.damage_flash_until = now + DAMAGE_FLASH_MS;
        sink.emit(GameEvent::DamageTaken { amount: lost });
    }
}
