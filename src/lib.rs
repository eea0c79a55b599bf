pub mod ai;
pub mod combat;
pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod game;
pub mod graphics;
pub mod input;
pub mod map;
pub mod movement;
pub mod physics;
pub mod render;
pub mod spawn;
pub mod texture;
pub mod weapon;
pub mod web;

pub use config::{Difficulty, EngineConfig};
pub use error::{EngineError, Result};
pub use events::{EventSink, GameEvent};
pub use game::{Game, TickOutcome, World, WorldSnapshot};
pub use graphics::{Color, FrameBuffer};
pub use input::FrameInput;
pub use map::GridMap;
pub use physics::Vec2;
pub use render::{RenderTarget, Renderer};
pub use texture::TextureTable;
