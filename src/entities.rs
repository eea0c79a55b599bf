//! Simulation entities: the player, enemies, dropped items and particles.

use serde::Serialize;

use crate::config::{EnemyConfig, EngineConfig};
use crate::physics::Vec2;
use crate::texture;
use crate::weapon::Weapon;

pub type EntityId = u32;

/// Monotonic id source, one per session
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: EntityId,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Vec2,
    /// Unit view direction
    pub dir: Vec2,
    /// Camera plane, perpendicular to `dir`, length `plane_scale`
    pub plane: Vec2,
    pub plane_scale: f64,
    health: i32,
    max_health: i32,
    pub weapon: Weapon,
    /// Height above the floor, never negative
    pub z: f64,
    pub vz: f64,
    /// Vertical look offset in screen pixels; positive looks up
    pub pitch: f64,
    /// Distance walked since the last footstep
    pub stride: f64,
}

impl Player {
    pub fn new(pos: Vec2, config: &EngineConfig) -> Self {
        let dir = Vec2::new(-1.0, 0.0);
        let scale = config.player.fov_scale;
        Self {
            pos,
            dir,
            plane: Self::plane_for(dir, scale),
            plane_scale: scale,
            health: config.player.max_health,
            max_health: config.player.max_health,
            weapon: Weapon::new(&config.weapon),
            z: 0.0,
            vz: 0.0,
            pitch: 0.0,
            stride: 0.0,
        }
    }

    /// Camera plane points to the right of the view direction
    #[inline]
    fn plane_for(dir: Vec2, scale: f64) -> Vec2 {
        Vec2::new(dir.y, -dir.x).scale(scale)
    }

    #[inline]
    pub fn health(&self) -> i32 {
        self.health
    }

    #[inline]
    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.z <= 0.0 && self.vz == 0.0
    }

    /// Apply damage, clamped at zero. Returns the health actually lost.
    pub fn damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        before - self.health
    }

    /// Heal up to max health. Returns the health actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health);
        self.health - before
    }

    /// Yaw by `angle` radians; positive turns left
    pub fn rotate(&mut self, angle: f64) {
        self.dir = self.dir.rotate(angle).normalize();
        self.plane = Self::plane_for(self.dir, self.plane_scale);
    }

    pub fn face(&mut self, dir: Vec2) {
        let dir = dir.normalize();
        if dir != Vec2::zero() {
            self.dir = dir;
            self.plane = Self::plane_for(dir, self.plane_scale);
        }
    }

    pub fn set_plane_scale(&mut self, scale: f64) {
        self.plane_scale = scale;
        self.plane = Self::plane_for(self.dir, scale);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyState {
    /// Stationary until the player is close and visible
    Idle,
    /// Pursuing and attacking; never returns to idle
    Chase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Basic,
    Elite,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: EntityId,
    pub pos: Vec2,
    pub dir: Vec2,
    pub state: EnemyState,
    pub kind: EnemyKind,
    pub health: i32,
    pub max_health: i32,
    pub texture: u32,
    pub last_melee_at: f64,
    pub last_ranged_at: f64,
    /// Seconds spent moving, drives the walk cycle
    pub anim_timer: f64,
}

impl Enemy {
    pub fn new(id: EntityId, pos: Vec2, kind: EnemyKind, config: &EnemyConfig) -> Self {
        let (max_health, texture) = match kind {
            EnemyKind::Basic => (config.health, texture::ENEMY_BASIC),
            EnemyKind::Elite => (config.health * 3 / 2, texture::ENEMY_ELITE),
        };
        Self {
            id,
            pos,
            dir: Vec2::new(1.0, 0.0),
            state: EnemyState::Idle,
            kind,
            health: max_health,
            max_health,
            texture,
            last_melee_at: f64::NEG_INFINITY,
            last_ranged_at: f64::NEG_INFINITY,
            anim_timer: 0.0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, clamped at zero
    pub fn damage(&mut self, amount: i32) {
        self.health = (self.health - amount.max(0)).max(0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Health,
    Ammo,
}

#[derive(Clone, Debug)]
pub struct Item {
    pub id: EntityId,
    pub pos: Vec2,
    pub kind: ItemKind,
    pub spawned_at: f64,
}

impl Item {
    pub fn texture(&self) -> u32 {
        match self.kind {
            ItemKind::Health => texture::ITEM_HEALTH,
            ItemKind::Ammo => texture::ITEM_AMMO,
        }
    }

    #[inline]
    pub fn is_expired(&self, now: f64, lifetime_ms: f64) -> bool {
        now - self.spawned_at > lifetime_ms
    }
}

/// Purely cosmetic point sprite
#[derive(Clone, Debug)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub texture: u32,
    /// Remaining life, 1.0 at spawn down to 0.0
    pub life: f64,
    /// Life lost per second
    pub decay: f64,
}

impl Particle {
    /// Advance one step. Returns false once the particle has expired.
    pub fn step(&mut self, dt: f64) -> bool {
        self.life -= self.decay * dt;
        if self.life <= 0.0 {
            return false;
        }
        self.vel = self.vel.scale(0.95); // Air resistance
        self.pos = self.pos.add(&self.vel.scale(dt));
        true
    }
}

/// Presentation-only weapon feedback. Deadlines are absolute timestamps in
/// ms; none of this gates gameplay.
#[derive(Clone, Debug, Default)]
pub struct Effects {
    pub recoil: f64,
    pub muzzle_flash_until: f64,
    pub hit_marker_until: f64,
    pub headshot_until: f64,
    pub damage_flash_until: f64,
}

impl Effects {
    pub fn muzzle_flash(&self, now: f64) -> bool {
        now < self.muzzle_flash_until
    }

    pub fn hit_marker(&self, now: f64) -> bool {
        now < self.hit_marker_until
    }

    pub fn headshot(&self, now: f64) -> bool {
        now < self.headshot_until
    }

    pub fn damage_flash(&self, now: f64) -> bool {
        now < self.damage_flash_until
    }

    /// Linear decay of the recoil scalar toward zero
    pub fn decay_recoil(&mut self, rate: f64, dt: f64) {
        self.recoil = (self.recoil - rate * dt).max(0.0);
    }
}
