//! Player kinematics: look, zoom, jump, walking with wall sliding, item
//! pickup and recoil decay.

use tracing::debug;

use crate::config::EngineConfig;
use crate::entities::ItemKind;
use crate::events::{EventSink, GameEvent};
use crate::game::World;
use crate::input::FrameInput;
use crate::physics::{slide_move, Vec2};

pub fn update<S: EventSink>(
    world: &mut World,
    config: &EngineConfig,
    input: &FrameInput,
    now: f64,
    dt: f64,
    sink: &mut S,
) {
    look(world, config, input, dt);
    zoom(world, config, input, dt);
    vertical(world, config, input, dt);
    walk(world, config, input, dt, sink);
    items(world, config, now, sink);
    world
        .effects
        .decay_recoil(config.combat.recoil_decay, dt);
}

fn look(world: &mut World, config: &EngineConfig, input: &FrameInput, dt: f64) {
    let cfg = &config.player;
    let player = &mut world.player;

    // Pointer right turns right, which is a negative rotation
    let mut yaw = -input.look_dx * cfg.yaw_sensitivity;
    if input.turn_left {
        yaw += cfg.turn_speed * dt;
    }
    if input.turn_right {
        yaw -= cfg.turn_speed * dt;
    }
    if yaw != 0.0 {
        player.rotate(yaw);
    }

    player.pitch = (player.pitch - input.look_dy * cfg.pitch_sensitivity)
        .clamp(-cfg.pitch_limit, cfg.pitch_limit);
}

fn zoom(world: &mut World, config: &EngineConfig, input: &FrameInput, dt: f64) {
    let cfg = &config.player;
    let target = if input.zoom {
        cfg.zoom_scale
    } else {
        cfg.fov_scale
    };
    let player = &mut world.player;
    let blend = 1.0 - (-cfg.zoom_rate * dt).exp();
    let scale = player.plane_scale + (target - player.plane_scale) * blend;
    player.set_plane_scale(scale);
}

fn vertical(world: &mut World, config: &EngineConfig, input: &FrameInput, dt: f64) {
    let cfg = &config.player;
    let player = &mut world.player;

    if input.jump && player.is_grounded() {
        player.vz = cfg.jump_velocity;
    }
    if player.z > 0.0 || player.vz != 0.0 {
        player.vz -= cfg.gravity * dt;
        player.z += player.vz * dt;
        if player.z <= 0.0 && player.vz <= 0.0 {
            player.z = 0.0;
            player.vz = 0.0;
        }
    }
}

fn walk<S: EventSink>(
    world: &mut World,
    config: &EngineConfig,
    input: &FrameInput,
    dt: f64,
    sink: &mut S,
) {
    let cfg = &config.player;
    let player = &mut world.player;
    let forward = player.dir;
    let right = player.plane.normalize();

    let mut wish = Vec2::zero();
    if input.forward {
        wish = wish.add(&forward);
    }
    if input.back {
        wish = wish.sub(&forward);
    }
    if input.strafe_right {
        wish = wish.add(&right);
    }
    if input.strafe_left {
        wish = wish.sub(&right);
    }
    let wish = wish.normalize();
    if wish == Vec2::zero() {
        return;
    }

    let map = &world.map;
    let delta = wish.scale(cfg.move_speed * dt);
    let next = slide_move(player.pos, delta, cfg.radius, |x, y| map.is_solid_at(x, y));
    let travelled = next.distance_to(&player.pos);
    player.pos = next;

    if player.is_grounded() && travelled > 0.0 {
        player.stride += travelled;
        if player.stride >= cfg.footstep_stride {
            player.stride -= cfg.footstep_stride;
            sink.emit(GameEvent::Footstep);
        }
    }
}

fn items<S: EventSink>(world: &mut World, config: &EngineConfig, now: f64, sink: &mut S) {
    let cfg = &config.items;
    let player = &mut world.player;

    world.items.retain(|item| {
        if item.is_expired(now, cfg.lifetime_ms) {
            debug!(id = item.id, "item expired");
            return false;
        }
        if item.pos.distance_to(&player.pos) > cfg.pickup_radius {
            return true;
        }
        match item.kind {
            ItemKind::Health => {
                let amount = player.heal(cfg.heal_amount);
                sink.emit(GameEvent::Heal { amount });
            }
            ItemKind::Ammo => {
                player.weapon.add_reserve(cfg.ammo_amount);
            }
        }
        sink.emit(GameEvent::Pickup { kind: item.kind });
        false
    });
}
