//! Clip/reserve bookkeeping and the timed reload state machine.

use serde::Serialize;
use tracing::debug;

use crate::config::WeaponConfig;

/// Cosmetic subdivisions of a reload, in order, with their share of the
/// total duration. Gameplay only looks at the READY/RELOADING boundary.
const PHASES: [(ReloadPhase, f64); 5] = [
    (ReloadPhase::Lower, 0.20),
    (ReloadPhase::Hold, 0.20),
    (ReloadPhase::Raise, 0.25),
    (ReloadPhase::Rack, 0.20),
    (ReloadPhase::Stabilize, 0.15),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPhase {
    Lower,
    Hold,
    Raise,
    Rack,
    Stabilize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReloadState {
    Ready,
    Reloading { started_at: f64, completes_at: f64 },
}

/// Result of pulling the trigger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerPull {
    /// A round left the barrel; `emptied` when that was the last in the clip
    Fired { emptied: bool },
    /// Clip empty, nothing fired
    DryFire,
    /// Mid-reload, input ignored
    Busy,
}

#[derive(Clone, Debug)]
pub struct Weapon {
    clip: u32,
    reserve: u32,
    capacity: u32,
    reserve_cap: u32,
    reload_ms: f64,
    infinite: bool,
    state: ReloadState,
}

impl Weapon {
    pub fn new(config: &WeaponConfig) -> Self {
        Self::with_ammo(config, config.clip_capacity, config.starting_reserve)
    }

    /// Weapon with explicit ammo counts, clamped to capacity and reserve cap
    pub fn with_ammo(config: &WeaponConfig, clip: u32, reserve: u32) -> Self {
        Self {
            clip: clip.min(config.clip_capacity),
            reserve: reserve.min(config.reserve_cap),
            capacity: config.clip_capacity,
            reserve_cap: config.reserve_cap,
            reload_ms: config.reload_ms,
            infinite: config.infinite_ammo,
            state: ReloadState::Ready,
        }
    }

    #[inline]
    pub fn clip(&self) -> u32 {
        self.clip
    }

    #[inline]
    pub fn reserve(&self) -> u32 {
        self.reserve
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn infinite(&self) -> bool {
        self.infinite
    }

    #[inline]
    pub fn state(&self) -> ReloadState {
        self.state
    }

    #[inline]
    pub fn is_reloading(&self) -> bool {
        matches!(self.state, ReloadState::Reloading { .. })
    }

    pub fn can_reload(&self) -> bool {
        !self.infinite && !self.is_reloading() && self.clip < self.capacity && self.reserve > 0
    }

    /// Start a reload if one is allowed. Returns whether it started; invalid
    /// requests are dropped silently.
    pub fn request_reload(&mut self, now: f64, owner_alive: bool) -> bool {
        if !owner_alive || !self.can_reload() {
            return false;
        }
        self.state = ReloadState::Reloading {
            started_at: now,
            completes_at: now + self.reload_ms,
        };
        debug!(clip = self.clip, reserve = self.reserve, "reload started");
        true
    }

    /// Finish a due reload. Returns the rounds moved into the clip, or `None`
    /// when nothing was due. Calling it again after completion is a no-op.
    pub fn update(&mut self, now: f64) -> Option<u32> {
        let ReloadState::Reloading { completes_at, .. } = self.state else {
            return None;
        };
        if now < completes_at {
            return None;
        }
        let moved = (self.capacity - self.clip).min(self.reserve);
        self.clip += moved;
        self.reserve -= moved;
        self.state = ReloadState::Ready;
        debug!(moved, clip = self.clip, reserve = self.reserve, "reload finished");
        Some(moved)
    }

    pub fn pull_trigger(&mut self) -> TriggerPull {
        if self.is_reloading() {
            return TriggerPull::Busy;
        }
        if self.infinite {
            return TriggerPull::Fired { emptied: false };
        }
        if self.clip == 0 {
            return TriggerPull::DryFire;
        }
        self.clip -= 1;
        TriggerPull::Fired {
            emptied: self.clip == 0,
        }
    }

    /// Add rounds to the reserve, capped. Returns how many were accepted.
    pub fn add_reserve(&mut self, amount: u32) -> u32 {
        let accepted = amount.min(self.reserve_cap.saturating_sub(self.reserve));
        self.reserve += accepted;
        accepted
    }

    pub fn reserve_full(&self) -> bool {
        self.reserve >= self.reserve_cap
    }

    /// Fraction of the current reload elapsed, 0.0 - 1.0
    pub fn reload_progress(&self, now: f64) -> Option<f64> {
        match self.state {
            ReloadState::Ready => None,
            ReloadState::Reloading {
                started_at,
                completes_at,
            } => {
                let span = (completes_at - started_at).max(f64::EPSILON);
                Some(((now - started_at) / span).clamp(0.0, 1.0))
            }
        }
    }

    pub fn reload_phase(&self, now: f64) -> Option<ReloadPhase> {
        let progress = self.reload_progress(now)?;
        let mut edge = 0.0;
        for (phase, share) in PHASES {
            edge += share;
            if progress < edge {
                return Some(phase);
            }
        }
        Some(ReloadPhase::Stabilize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: u32) -> WeaponConfig {
        WeaponConfig {
            clip_capacity: capacity,
            reserve_cap: 100,
            reload_ms: 1000.0,
            ..WeaponConfig::default()
        }
    }

    #[test]
    fn test_reload_transfers_missing_rounds() {
        let mut weapon = Weapon::with_ammo(&config(10), 3, 20);
        assert!(weapon.request_reload(0.0, true));
        assert_eq!(weapon.update(999.0), None);
        assert_eq!(weapon.update(1000.0), Some(7));
        assert_eq!(weapon.clip(), 10);
        assert_eq!(weapon.reserve(), 13);
        assert_eq!(weapon.state(), ReloadState::Ready);
    }

    #[test]
    fn test_reload_limited_by_reserve() {
        let mut weapon = Weapon::with_ammo(&config(10), 3, 2);
        assert!(weapon.request_reload(0.0, true));
        assert_eq!(weapon.update(2000.0), Some(2));
        assert_eq!(weapon.clip(), 5);
        assert_eq!(weapon.reserve(), 0);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut weapon = Weapon::with_ammo(&config(10), 0, 30);
        weapon.request_reload(0.0, true);
        assert_eq!(weapon.update(1500.0), Some(10));
        assert_eq!(weapon.update(1600.0), None);
        assert_eq!(weapon.reserve(), 20);
    }

    #[test]
    fn test_invalid_reload_requests_ignored() {
        let mut full = Weapon::with_ammo(&config(10), 10, 30);
        assert!(!full.request_reload(0.0, true));

        let mut dry = Weapon::with_ammo(&config(10), 2, 0);
        assert!(!dry.request_reload(0.0, true));

        let mut dead = Weapon::with_ammo(&config(10), 2, 30);
        assert!(!dead.request_reload(0.0, false));

        let mut busy = Weapon::with_ammo(&config(10), 2, 30);
        assert!(busy.request_reload(0.0, true));
        assert!(!busy.request_reload(100.0, true));
        assert_eq!(
            busy.state(),
            ReloadState::Reloading {
                started_at: 0.0,
                completes_at: 1000.0
            }
        );

        let mut infinite = Weapon::with_ammo(
            &WeaponConfig {
                infinite_ammo: true,
                ..config(10)
            },
            2,
            30,
        );
        assert!(!infinite.request_reload(0.0, true));
    }

    #[test]
    fn test_trigger_states() {
        let mut weapon = Weapon::with_ammo(&config(10), 1, 5);
        assert_eq!(weapon.pull_trigger(), TriggerPull::Fired { emptied: true });
        assert_eq!(weapon.pull_trigger(), TriggerPull::DryFire);
        weapon.request_reload(0.0, true);
        assert_eq!(weapon.pull_trigger(), TriggerPull::Busy);
        assert_eq!(weapon.clip(), 0);
    }

    #[test]
    fn test_reserve_is_capped() {
        let mut weapon = Weapon::with_ammo(&config(10), 10, 95);
        assert_eq!(weapon.add_reserve(12), 5);
        assert!(weapon.reserve_full());
        assert_eq!(weapon.add_reserve(12), 0);
    }

    #[test]
    fn test_reload_phases_in_order() {
        let mut weapon = Weapon::with_ammo(&config(10), 0, 30);
        assert_eq!(weapon.reload_phase(0.0), None);
        weapon.request_reload(0.0, true);
        assert_eq!(weapon.reload_phase(100.0), Some(ReloadPhase::Lower));
        assert_eq!(weapon.reload_phase(300.0), Some(ReloadPhase::Hold));
        assert_eq!(weapon.reload_phase(500.0), Some(ReloadPhase::Raise));
        assert_eq!(weapon.reload_phase(700.0), Some(ReloadPhase::Rack));
        assert_eq!(weapon.reload_phase(900.0), Some(ReloadPhase::Stabilize));
    }
}
