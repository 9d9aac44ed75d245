//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod actor;
pub mod cooldown;
pub mod drive;
pub mod effects;
pub mod modifiers;
pub mod quotes;
pub mod state;
pub mod tick;
pub mod timers;

pub use actor::{Actor, ActorKind, Behavior, DamageOutcome, EntityId, RangedAttack, Vitality};
pub use cooldown::CooldownTimer;
pub use drive::ImprobabilityDrive;
pub use effects::{CATALOG, ImprobableEffect, RevertToken};
pub use modifiers::{Modifier, WorldModifiers};
pub use quotes::QuoteManager;
pub use state::{
    Collectible, CollectibleKind, EntityKind, GameEvent, GamePhase, GameState, ScheduledAction,
    SoundCue, Transient, TransientKind,
};
pub use tick::{Contact, TickInput, generate_level, tick};
pub use timers::{TimerHandle, TimerQueue, TimerScope};
