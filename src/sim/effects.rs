//! The catalog of improbable events
//!
//! Each effect mutates the world when applied and hands back a
//! [`RevertToken`] describing exactly what to undo. Reverts look every target
//! up again and skip whatever has disappeared in the meantime.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::actor::EntityId;
use super::modifiers::Modifier;
use super::state::{GameEvent, GameState, TransientKind};
use crate::Millis;
use crate::consts::*;

/// Message for an effect name nobody recognizes
pub const FALLBACK_MESSAGE: &str = "Something improbable has happened!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImprobableEffect {
    ReverseGravity,
    SpawnTowels,
    SpawnWhale,
    FlowerPots,
    TemporaryInvincibility,
    SlowMotion,
    EnemyTransformation,
    ColorInversion,
    FishTransformation,
}

/// Every effect the drive can pick, uniformly
pub const CATALOG: [ImprobableEffect; 9] = [
    ImprobableEffect::ReverseGravity,
    ImprobableEffect::SpawnTowels,
    ImprobableEffect::SpawnWhale,
    ImprobableEffect::FlowerPots,
    ImprobableEffect::TemporaryInvincibility,
    ImprobableEffect::SlowMotion,
    ImprobableEffect::EnemyTransformation,
    ImprobableEffect::ColorInversion,
    ImprobableEffect::FishTransformation,
];

impl ImprobableEffect {
    pub fn name(&self) -> &'static str {
        match self {
            ImprobableEffect::ReverseGravity => "reverseGravity",
            ImprobableEffect::SpawnTowels => "spawnTowels",
            ImprobableEffect::SpawnWhale => "spawnWhale",
            ImprobableEffect::FlowerPots => "flowerPots",
            ImprobableEffect::TemporaryInvincibility => "temporaryInvincibility",
            ImprobableEffect::SlowMotion => "slowMotion",
            ImprobableEffect::EnemyTransformation => "enemyTransformation",
            ImprobableEffect::ColorInversion => "colorInversion",
            ImprobableEffect::FishTransformation => "fishTransformation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CATALOG.iter().copied().find(|e| e.name().eq_ignore_ascii_case(name))
    }

    /// Time until the revert runs
    pub fn duration_ms(&self) -> Millis {
        match self {
            ImprobableEffect::ReverseGravity => 4000,
            // Towels stay until collected
            ImprobableEffect::SpawnTowels => 0,
            ImprobableEffect::SpawnWhale => 10_000,
            ImprobableEffect::FlowerPots => 10_000,
            ImprobableEffect::TemporaryInvincibility => 10_000,
            ImprobableEffect::SlowMotion => 5000,
            ImprobableEffect::EnemyTransformation => 8000,
            ImprobableEffect::ColorInversion => 6000,
            ImprobableEffect::FishTransformation => 10_000,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ImprobableEffect::ReverseGravity => "Gravity decided to take a brief vacation!",
            ImprobableEffect::SpawnTowels => {
                "By an extraordinary coincidence, extra towels have materialized!"
            }
            ImprobableEffect::SpawnWhale => "Oh no, not again.",
            ImprobableEffect::FlowerPots => "Watch out for falling flower pots!",
            ImprobableEffect::TemporaryInvincibility => "You've become improbably invulnerable!",
            ImprobableEffect::SlowMotion => "Time is slowing down... well, more than usual.",
            ImprobableEffect::EnemyTransformation => {
                "The Vogons are experiencing an identity crisis!"
            }
            ImprobableEffect::ColorInversion => {
                "Reality has temporarily decided to try a new look."
            }
            ImprobableEffect::FishTransformation => "Don't forget your babel fish!",
        }
    }

    /// Mutate the world and return what is needed to undo it
    pub fn apply(self, state: &mut GameState) -> RevertToken {
        match self {
            ImprobableEffect::ReverseGravity => {
                log::info!("Gravity reversal!");
                state.modifiers.push(Modifier::GravityReversed);
                RevertToken::Modifier(Modifier::GravityReversed)
            }
            ImprobableEffect::SlowMotion => {
                log::info!("Slow motion activated!");
                state.modifiers.push(Modifier::SlowMotion);
                RevertToken::Modifier(Modifier::SlowMotion)
            }
            ImprobableEffect::ColorInversion => {
                log::info!("Color inversion!");
                state.modifiers.push(Modifier::ColorInverted);
                RevertToken::Modifier(Modifier::ColorInverted)
            }
            ImprobableEffect::SpawnTowels => RevertToken::Towels(spawn_towels(state)),
            ImprobableEffect::SpawnWhale => {
                RevertToken::Spawned(spawn_whale(state, self.duration_ms()))
            }
            ImprobableEffect::FlowerPots => {
                RevertToken::Spawned(spawn_flower_pots(state, self.duration_ms()))
            }
            ImprobableEffect::TemporaryInvincibility => {
                log::info!("Player temporarily invincible!");
                let actor = state.player_id();
                let now = state.now;
                let deadline = state
                    .player_mut()
                    .and_then(|p| p.grant_invulnerability(self.duration_ms(), now));
                if let Some(until) = deadline {
                    state.emit(GameEvent::InvulnerabilityStarted { actor, until });
                }
                RevertToken::Invulnerability { actor, deadline }
            }
            ImprobableEffect::EnemyTransformation => {
                log::info!("Enemy transformation!");
                let ids = state.enemy_ids();
                for id in &ids {
                    if let Some(enemy) = state.actor_mut(*id) {
                        enemy.transform();
                    }
                }
                RevertToken::Transformed(ids)
            }
            ImprobableEffect::FishTransformation => {
                log::info!("Babel fish transformation!");
                let id = state.player_id();
                let ids = match state.player_mut() {
                    Some(p) if !p.is_dead() => {
                        p.transform();
                        vec![id]
                    }
                    _ => Vec::new(),
                };
                RevertToken::Transformed(ids)
            }
        }
    }
}

/// State needed to undo an applied effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevertToken {
    /// Release one override of a world parameter
    Modifier(Modifier),
    /// Transients to remove if they are still around
    Spawned(Vec<EntityId>),
    /// Spawned towels stay until collected
    Towels(Vec<EntityId>),
    /// End the granted invulnerability unless it was superseded
    Invulnerability {
        actor: EntityId,
        deadline: Option<Millis>,
    },
    /// Actors to turn back
    Transformed(Vec<EntityId>),
}

impl RevertToken {
    /// Undo the effect. Safe to run after any of its targets are gone.
    pub fn revert(self, state: &mut GameState) {
        match self {
            RevertToken::Modifier(modifier) => {
                state.modifiers.pop(modifier);
            }
            RevertToken::Spawned(ids) => {
                for id in ids {
                    if !state.despawn_transient(id) {
                        log::debug!("Transient {} already gone before revert", id);
                    }
                }
            }
            RevertToken::Towels(ids) => {
                log::debug!("{} improbable towels left for the taking", ids.len());
            }
            RevertToken::Invulnerability { actor, deadline } => {
                if let Some(deadline) = deadline {
                    state.end_invulnerability(actor, deadline);
                }
            }
            RevertToken::Transformed(ids) => {
                for id in ids {
                    match state.actor_mut(id) {
                        Some(actor) if !actor.is_dead() => {
                            actor.untransform();
                        }
                        _ => log::debug!("Actor {} no longer around to transform back", id),
                    }
                }
            }
        }
    }
}

/// Message for an effect by name, with a generic fallback
pub fn message_for(name: &str) -> &'static str {
    ImprobableEffect::from_name(name)
        .map(|e| e.message())
        .unwrap_or(FALLBACK_MESSAGE)
}

fn spawn_towels(state: &mut GameState) -> Vec<EntityId> {
    log::info!("Extra towels materializing!");
    let count = state.rng.random_range(3..=6usize);
    let center = state.player().map(|p| p.pos).unwrap_or(Vec2::ZERO);
    let radius = 100.0;
    let step = TAU / count as f32;
    (0..count)
        .map(|i| {
            let angle = i as f32 * step;
            let pos = center + Vec2::new(angle.cos(), angle.sin()) * radius;
            state.spawn_towel(pos)
        })
        .collect()
}

fn spawn_whale(state: &mut GameState, lifespan: Millis) -> Vec<EntityId> {
    log::info!("Whale materialization event!");
    let center = state.player().map(|p| p.pos).unwrap_or(Vec2::ZERO);
    let whale_pos = center - Vec2::new(0.0, 300.0);
    let whale = state.spawn_transient(TransientKind::Whale, whale_pos, Vec2::ZERO, 500.0, lifespan);
    let petunias = state.spawn_transient(
        TransientKind::Petunias,
        whale_pos + Vec2::new(50.0, -20.0),
        Vec2::ZERO,
        500.0,
        lifespan,
    );
    for (id, thought) in [
        (
            whale,
            "Wow! What's happening? Who am I?\nWhy am I here? What's my purpose in life?",
        ),
        (petunias, "Oh no, not again."),
    ] {
        if let Some(t) = state.transients.iter_mut().find(|t| t.id == id) {
            t.thought = Some(thought.to_string());
        }
    }
    vec![whale, petunias]
}

fn spawn_flower_pots(state: &mut GameState, lifespan: Millis) -> Vec<EntityId> {
    log::info!("Flower pot storm incoming!");
    let count = state.rng.random_range(5..=12usize);
    (0..count)
        .map(|_| {
            let x = state.rng.random_range(0.0..=WORLD_WIDTH);
            let y = state.rng.random_range(-300.0..=-50.0);
            let vx = state.rng.random_range(-50.0..=50.0);
            state.spawn_transient(
                TransientKind::FlowerPot,
                Vec2::new(x, y),
                Vec2::new(vx, 0.0),
                300.0,
                lifespan,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::Behavior;

    #[test]
    fn test_names_round_trip_through_catalog() {
        for effect in CATALOG {
            assert_eq!(ImprobableEffect::from_name(effect.name()), Some(effect));
        }
        assert_eq!(message_for("summonZaphod"), FALLBACK_MESSAGE);
        assert_eq!(message_for("spawnWhale"), "Oh no, not again.");
    }

    #[test]
    fn test_durations_within_range() {
        for effect in CATALOG {
            if effect != ImprobableEffect::SpawnTowels {
                assert!((4000..=10_000).contains(&effect.duration_ms()), "{:?}", effect);
            }
        }
    }

    #[test]
    fn test_gravity_revert_restores() {
        let mut state = GameState::new(3);
        let token = ImprobableEffect::ReverseGravity.apply(&mut state);
        assert_eq!(state.modifiers.gravity_sign(), -1.0);
        token.revert(&mut state);
        assert_eq!(state.modifiers.gravity_sign(), 1.0);
    }

    #[test]
    fn test_spawned_hazards_revert_after_partial_cleanup() {
        let mut state = GameState::new(3);
        let token = ImprobableEffect::FlowerPots.apply(&mut state);
        let RevertToken::Spawned(ids) = &token else {
            panic!("flower pots should spawn transients");
        };
        assert!((5..=12).contains(&ids.len()));

        // Gameplay already smashed one pot
        assert!(state.despawn_transient(ids[0]));
        token.revert(&mut state);
        assert!(state.transients.is_empty());
    }

    #[test]
    fn test_enemy_transformation_skips_destroyed_enemies() {
        let mut state = GameState::new(3);
        let a = state.spawn_vogon(Vec2::new(300.0, 300.0), Behavior::Stationary);
        let b = state.spawn_vogon(Vec2::new(500.0, 300.0), Behavior::Stationary);
        let token = ImprobableEffect::EnemyTransformation.apply(&mut state);
        assert!(state.actor(a).unwrap().is_transformed());

        state.actors.retain(|x| x.id != a);
        token.revert(&mut state);
        assert!(!state.actor(b).unwrap().is_transformed());
    }

    #[test]
    fn test_invincibility_revert_ignores_superseded_grant() {
        let mut state = GameState::new(3);
        let token = ImprobableEffect::TemporaryInvincibility.apply(&mut state);
        let id = state.player_id();
        state.now = 2000;
        let later = state.grant_invulnerability(id, 20_000).unwrap();

        token.revert(&mut state);
        assert_eq!(state.player().unwrap().invulnerable_until(), Some(later));
    }

    #[test]
    fn test_towels_surround_player() {
        let mut state = GameState::new(3);
        let center = state.player().unwrap().pos;
        let RevertToken::Towels(ids) = ImprobableEffect::SpawnTowels.apply(&mut state) else {
            panic!("expected towels");
        };
        assert!((3..=6).contains(&ids.len()));
        for c in &state.collectibles {
            assert!((c.pos.distance(center) - 100.0).abs() < 0.01);
        }
    }
}
