//! Engine tunables and difficulty tiers.
//!
//! Every section is `#[serde(default)]`, so a JSON config only needs the
//! fields it overrides. Times are milliseconds, distances are map units.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// What a difficulty tier scales. Speed and aggro radius are deliberately
/// absent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyProfile {
    pub melee_damage: i32,
    pub ranged_damage: i32,
    pub ranged_cooldown_ms: f64,
}

impl Difficulty {
    /// Index as passed from the page: 0 easy, 2 hard, anything else medium
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Difficulty::Easy,
            2 => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }

    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                melee_damage: 5,
                ranged_damage: 3,
                ranged_cooldown_ms: 2500.0,
            },
            Difficulty::Medium => DifficultyProfile {
                melee_damage: 10,
                ranged_damage: 6,
                ranged_cooldown_ms: 1800.0,
            },
            Difficulty::Hard => DifficultyProfile {
                melee_damage: 18,
                ranged_damage: 10,
                ranged_cooldown_ms: 1200.0,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub player: PlayerConfig,
    pub weapon: WeaponConfig,
    pub enemy: EnemyConfig,
    pub combat: CombatConfig,
    pub items: ItemConfig,
    pub render: RenderConfig,
    pub sim: SimConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub move_speed: f64,
    pub radius: f64,
    pub jump_velocity: f64,
    pub gravity: f64,
    pub fov_scale: f64,
    pub zoom_scale: f64,
    /// Exponential approach rate of the camera plane scale, per second
    pub zoom_rate: f64,
    /// Radians per pointer pixel
    pub yaw_sensitivity: f64,
    /// Radians per second while a turn key is held
    pub turn_speed: f64,
    /// Screen pixels of pitch per pointer pixel
    pub pitch_sensitivity: f64,
    pub pitch_limit: f64,
    pub footstep_stride: f64,
    pub max_health: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            radius: 0.2,
            jump_velocity: 4.2,
            gravity: 12.0,
            fov_scale: 0.66,
            zoom_scale: 0.33,
            zoom_rate: 12.0,
            yaw_sensitivity: 0.0025,
            turn_speed: 2.5,
            pitch_sensitivity: 1.0,
            pitch_limit: 200.0,
            footstep_stride: 1.4,
            max_health: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub clip_capacity: u32,
    pub starting_reserve: u32,
    pub reserve_cap: u32,
    pub reload_ms: f64,
    pub infinite_ammo: bool,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            clip_capacity: 12,
            starting_reserve: 48,
            reserve_cap: 96,
            reload_ms: 1500.0,
            infinite_ammo: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub speed: f64,
    pub radius: f64,
    pub aggro_radius: f64,
    pub melee_range: f64,
    pub ranged_range: f64,
    pub melee_cooldown_ms: f64,
    pub health: i32,
    pub elite_chance: f64,
    pub population_cap: usize,
    pub initial_count: usize,
    pub spawn_cooldown_ms: f64,
    pub spawn_min_distance: f64,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            speed: 1.6,
            radius: 0.25,
            aggro_radius: 11.0,
            melee_range: 1.0,
            ranged_range: 9.0,
            melee_cooldown_ms: 1000.0,
            health: 100,
            elite_chance: 0.4,
            population_cap: 8,
            initial_count: 4,
            spawn_cooldown_ms: 4000.0,
            spawn_min_distance: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub hit_width: f64,
    /// Top fraction of a sprite that counts as the head
    pub head_fraction: f64,
    pub head_damage: i32,
    pub body_damage: i32,
    pub kill_score: u32,
    pub headshot_kill_score: u32,
    pub max_range: f64,
    pub muzzle_flash_ms: f64,
    pub hit_marker_ms: f64,
    pub headshot_ms: f64,
    pub recoil_impulse: f64,
    /// Recoil units removed per second
    pub recoil_decay: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            hit_width: 0.5,
            head_fraction: 0.25,
            head_damage: 100,
            body_damage: 40,
            kill_score: 100,
            headshot_kill_score: 150,
            max_range: 64.0,
            muzzle_flash_ms: 60.0,
            hit_marker_ms: 150.0,
            headshot_ms: 600.0,
            recoil_impulse: 1.0,
            recoil_decay: 4.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemConfig {
    pub lifetime_ms: f64,
    pub pickup_radius: f64,
    pub heal_amount: i32,
    pub ammo_amount: u32,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            lifetime_ms: 10_000.0,
            pickup_radius: 0.8,
            heal_amount: 25,
            ammo_amount: 12,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Distance at which fog saturates
    pub fog_distance: f64,
    pub max_fog_alpha: f64,
    pub side_shade_alpha: f64,
    pub max_ray_distance: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fog_distance: 16.0,
            max_fog_alpha: 0.85,
            side_shade_alpha: 0.35,
            max_ray_distance: 64.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Upper bound on a single step, in seconds
    pub max_dt: f64,
    pub max_particles: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_dt: 0.1,
            max_particles: 96,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }

        positive("player.move_speed", self.player.move_speed)?;
        positive("player.gravity", self.player.gravity)?;
        positive("player.fov_scale", self.player.fov_scale)?;
        positive("player.zoom_scale", self.player.zoom_scale)?;
        positive("player.max_health", self.player.max_health as f64)?;
        positive("weapon.clip_capacity", self.weapon.clip_capacity as f64)?;
        positive("weapon.reload_ms", self.weapon.reload_ms)?;
        positive("enemy.aggro_radius", self.enemy.aggro_radius)?;
        positive("enemy.melee_range", self.enemy.melee_range)?;
        positive("enemy.health", self.enemy.health as f64)?;
        positive("combat.hit_width", self.combat.hit_width)?;
        positive("items.lifetime_ms", self.items.lifetime_ms)?;
        positive("items.pickup_radius", self.items.pickup_radius)?;
        positive("render.fog_distance", self.render.fog_distance)?;
        positive("render.max_ray_distance", self.render.max_ray_distance)?;
        positive("sim.max_dt", self.sim.max_dt)?;

        if self.enemy.ranged_range <= self.enemy.melee_range {
            return Err(EngineError::InvalidConfig(
                "enemy.ranged_range must exceed enemy.melee_range".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.combat.head_fraction) || self.combat.head_fraction == 0.0 {
            return Err(EngineError::InvalidConfig(
                "combat.head_fraction must be within (0, 1)".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.enemy.elite_chance) {
            return Err(EngineError::InvalidConfig(
                "enemy.elite_chance must be within [0, 1]".into(),
            ));
        }
        if self.weapon.reserve_cap < self.weapon.starting_reserve {
            return Err(EngineError::InvalidConfig(
                "weapon.starting_reserve exceeds weapon.reserve_cap".into(),
            ));
        }
        Ok(())
    }
}
