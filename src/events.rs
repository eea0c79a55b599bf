use serde::Serialize;

use crate::entities::ItemKind;

/// Discrete things that happened during a tick, for sound, flashes and HUD.
/// The simulation never waits on whoever consumes them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Shoot,
    DryFire,
    Reload,
    ReloadComplete { rounds: u32 },
    Hit { headshot: bool },
    Kill { headshot: bool },
    DamageTaken { amount: i32 },
    Heal { amount: i32 },
    Pickup { kind: ItemKind },
    Footstep,
    PlayerDied,
}

pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// Sink that drops everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}
