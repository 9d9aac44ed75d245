//! Improbability - the gameplay core of a Hitchhiker's Guide platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (actors, damage, improbable events, timers)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences
//!
//! Rendering, physics and input belong to the host engine. The host reports
//! positions and contacts through [`sim::TickInput`] and drains
//! [`sim::GameEvent`]s to drive its visuals and sounds.

pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{Character, Settings};
pub use tuning::{Tuning, TuningError};

/// Game time in milliseconds
pub type Millis = u64;

/// Game configuration constants
pub mod consts {
    use crate::Millis;

    /// Fixed simulation timestep (60 Hz, matching the host frame rate)
    pub const SIM_DT_MS: Millis = 16;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World size
    pub const WORLD_WIDTH: f32 = 800.0;
    pub const WORLD_HEIGHT: f32 = 600.0;
    /// Base downward gravity (pixels/s²)
    pub const GRAVITY: f32 = 980.0;

    /// The answer to the ultimate question of life, the universe, and everything
    pub const ANSWER_TO_EVERYTHING: u32 = 42;
    pub const TOWEL_VALUE: u32 = 5;
    pub const TOTAL_TOWELS: usize = 10;

    /// Player defaults
    pub const PLAYER_MAX_HEALTH: u32 = 100;
    /// Invulnerability after a hit
    pub const PLAYER_GRACE_MS: Millis = 1000;
    /// Invulnerability granted on reaching the milestone
    pub const MILESTONE_INVULNERABILITY_MS: Millis = 5000;

    /// Enemy defaults
    pub const ENEMY_MAX_HEALTH: u32 = 100;
    pub const ENEMY_CONTACT_DAMAGE: u32 = 20;
    pub const ENEMY_SCORE_VALUE: u32 = 10;
    pub const ENEMY_SPEED: f32 = 100.0;
    pub const PATROL_DISTANCE: f32 = 200.0;
    pub const FOLLOW_RANGE: f32 = 300.0;

    /// Vogon defaults
    pub const VOGON_MAX_HEALTH: u32 = 150;
    pub const VOGON_DAMAGE: u32 = 15;
    pub const VOGON_SCORE_VALUE: u32 = 25;
    pub const POETRY_COOLDOWN_MS: Millis = 3000;
    pub const POETRY_RANGE: f32 = 300.0;
    pub const POETRY_SPEED: f32 = 150.0;
    pub const POETRY_LIFESPAN_MS: Millis = 3000;

    /// Improbability drive
    pub const IMPROBABILITY_COOLDOWN_MS: Millis = 5000;
    pub const IMPROBABILITY_CHANCE: f64 = 0.05;
    /// Damage dealt by a falling flower pot
    pub const HAZARD_DAMAGE: u32 = 10;

    /// Quotes
    pub const QUOTE_COOLDOWN_MS: Millis = 30_000;
    pub const QUOTE_CHANCE: f64 = 0.3;
}

/// Horizontal direction (-1.0 or 1.0) pointing from `from` toward `to`
#[inline]
pub fn facing(from: glam::Vec2, to: glam::Vec2) -> f32 {
    if to.x < from.x { -1.0 } else { 1.0 }
}
