//! The Infinite Improbability Drive
//!
//! Once the cooldown floor has passed, every tick is a Bernoulli trial: on a
//! hit one effect is picked uniformly from the catalog and applied, and its
//! revert is scheduled. A miss leaves the cooldown untouched, so the next
//! tick rolls again.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cooldown::CooldownTimer;
use super::effects::{CATALOG, ImprobableEffect, RevertToken};
use super::state::{GameEvent, GameState, ScheduledAction, SoundCue};
use crate::Millis;

/// Screen flash before the milestone effects start (4 flashes of 2 x 200 ms)
pub const MILESTONE_FLASH_MS: Millis = 1600;

/// Milestone steps, as offsets after the flash
pub const MILESTONE_SEQUENCE: [(Millis, ImprobableEffect); 4] = [
    (500, ImprobableEffect::ReverseGravity),
    (1500, ImprobableEffect::SpawnTowels),
    (2500, ImprobableEffect::EnemyTransformation),
    (3500, ImprobableEffect::TemporaryInvincibility),
];

pub const MILESTONE_MESSAGE: &str =
    "The Answer to the Ultimate Question of Life,\nthe Universe, and Everything is... 42!";

/// An applied effect waiting for its revert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRevert {
    pub effect: ImprobableEffect,
    pub applied_at: Millis,
    pub token: RevertToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprobabilityDrive {
    cooldown: CooldownTimer,
    /// Chance per tick once the cooldown has passed
    pub probability: f64,
    pub enabled: bool,
    pending: BTreeMap<u64, PendingRevert>,
    next_effect_id: u64,
    /// Effects applied so far
    pub applied: u64,
    /// Reverts executed so far
    pub reverted: u64,
}

impl ImprobabilityDrive {
    pub fn new(cooldown_ms: Millis, probability: f64) -> Self {
        let mut cooldown = CooldownTimer::new(cooldown_ms);
        // No event in the first cooldown window
        cooldown.reset(0);
        log::info!(
            "Infinite Improbability Drive initialized. Reality stability no longer guaranteed."
        );
        Self {
            cooldown,
            probability,
            enabled: true,
            pending: BTreeMap::new(),
            next_effect_id: 0,
            applied: 0,
            reverted: 0,
        }
    }

    /// Decide whether an event fires at `now`, and which one.
    ///
    /// Only a hit resets the cooldown.
    pub fn roll(&mut self, now: Millis, rng: &mut impl Rng) -> Option<ImprobableEffect> {
        if !self.enabled || !self.cooldown.is_ready(now) {
            return None;
        }
        if rng.random::<f64>() >= self.probability {
            return None;
        }
        self.cooldown.reset(now);
        Some(CATALOG[rng.random_range(0..CATALOG.len())])
    }

    pub fn last_event(&self) -> Option<Millis> {
        self.cooldown.last_trigger()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Effects currently applied and not yet reverted
    pub fn active_effects(&self) -> impl Iterator<Item = ImprobableEffect> + '_ {
        self.pending.values().map(|p| p.effect)
    }

    fn register(
        &mut self,
        effect: ImprobableEffect,
        applied_at: Millis,
        token: RevertToken,
    ) -> u64 {
        let id = self.next_effect_id;
        self.next_effect_id += 1;
        self.applied += 1;
        self.pending.insert(
            id,
            PendingRevert {
                effect,
                applied_at,
                token,
            },
        );
        id
    }

    fn take(&mut self, effect_id: u64) -> Option<PendingRevert> {
        let pending = self.pending.remove(&effect_id)?;
        self.reverted += 1;
        Some(pending)
    }

    /// Forget every pending revert (scene teardown)
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

/// Per-tick drive update
pub fn update(state: &mut GameState) -> Option<ImprobableEffect> {
    let effect = state.drive.roll(state.now, &mut state.rng)?;
    log::info!("The Infinite Improbability Drive activates!");
    state.emit(GameEvent::Sound(SoundCue::Improbability));
    trigger_effect(state, effect);
    Some(effect)
}

/// Apply `effect` now, announce it, and schedule its single revert
pub fn trigger_effect(state: &mut GameState, effect: ImprobableEffect) -> u64 {
    let token = effect.apply(state);
    let effect_id = state.drive.register(effect, state.now, token);
    state.emit(GameEvent::EffectStarted(effect));
    state.emit(GameEvent::Message(effect.message().to_string()));
    state.schedule(effect.duration_ms(), ScheduledAction::RevertEffect { effect_id });
    effect_id
}

/// Run the revert for `effect_id`. A second call for the same id does nothing.
pub fn revert_effect(state: &mut GameState, effect_id: u64) -> bool {
    let Some(pending) = state.drive.take(effect_id) else {
        log::debug!("Revert {} already executed", effect_id);
        return false;
    };
    log::debug!(
        "Reverting {} applied at {}",
        pending.effect.name(),
        pending.applied_at
    );
    pending.token.revert(state);
    state.emit(GameEvent::EffectEnded(pending.effect));
    true
}

/// The massive variant: flash, then a fixed chain of effects
pub fn trigger_milestone_sequence(state: &mut GameState) {
    log::info!("The Heart of Gold's Infinite Improbability Drive goes into overdrive!");
    state.emit(GameEvent::Sound(SoundCue::ImprobabilityOverdrive));
    state.emit(GameEvent::ScreenFlash {
        duration_ms: MILESTONE_FLASH_MS,
    });
    for (offset, effect) in MILESTONE_SEQUENCE {
        state.schedule(MILESTONE_FLASH_MS + offset, ScheduledAction::ApplyEffect(effect));
    }
    state.schedule(
        MILESTONE_FLASH_MS,
        ScheduledAction::ShowMessage(MILESTONE_MESSAGE.to_string()),
    );
}
