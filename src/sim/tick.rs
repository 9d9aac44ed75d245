//! Per-frame simulation step
//!
//! The host's physics reports positions and overlaps; this advances the game
//! clock, fires due timers, resolves contacts in reported order, moves
//! enemies and transients, and rolls for improbable events and quotes.

use glam::Vec2;
use rand::Rng;

use super::actor::{Behavior, DamageOutcome, EntityId, step_behavior};
use super::drive;
use super::quotes;
use super::state::{GameEvent, GamePhase, GameState, ScheduledAction, SoundCue, TransientKind};
use crate::Millis;
use crate::consts::*;

/// An overlap reported by the host physics pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// Player touched an enemy
    EnemyTouch { enemy: EntityId },
    /// Player hit an enemy (stomp, thrown object)
    EnemyHit { enemy: EntityId, amount: u32 },
    /// Poetry projectile reached the player
    Poetry { projectile: EntityId },
    /// Flower pot landed on the player
    Hazard { hazard: EntityId },
    /// Flower pot smashed on a platform
    HazardLanded { hazard: EntityId },
    /// Player overlaps a towel
    Towel { collectible: EntityId },
}

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Player position from the host physics body
    pub player_pos: Option<Vec2>,
    /// Enemy positions from the host, overriding kinematic movement
    pub actor_positions: Vec<(EntityId, Vec2)>,
    /// Overlaps in the order the physics pass reported them
    pub contacts: Vec<Contact>,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game state by `dt` milliseconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: Millis) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    // Don't tick if paused or the run is over
    if state.phase != GamePhase::Playing {
        return;
    }

    state.now += dt;

    if let Some(pos) = input.player_pos {
        if let Some(player) = state.player_mut() {
            player.pos = pos;
        }
    }
    for &(id, pos) in &input.actor_positions {
        if let Some(actor) = state.actor_mut(id) {
            actor.pos = pos;
        }
    }

    // Expiries due this frame land before this frame's overlaps
    fire_due_timers(state);

    for contact in &input.contacts {
        resolve_contact(state, *contact);
    }

    // Physics time scale only; timers run on game time
    let dt_secs = dt as f32 / 1000.0 * state.modifiers.time_scale();
    step_actors(state, dt_secs);
    step_transients(state, dt_secs);

    if drive::update(state).is_some() {
        log::debug!("{} improbable effects pending revert", state.drive.pending_count());
    }

    let now = state.now;
    if let Some(quote) = state.quotes.update(now, &mut state.rng).map(str::to_string) {
        state.emit(GameEvent::Quote(quote));
    }

    // Defeated enemies leave the world; pending reverts skip them
    let fallen: Vec<EntityId> = state
        .actors
        .iter()
        .filter(|a| !a.is_player() && a.is_dead())
        .map(|a| a.id)
        .collect();
    for id in fallen {
        state.actors.retain(|a| a.id != id);
        state.emit(GameEvent::Despawned { id });
    }

    if state.phase == GamePhase::Playing && state.towels_remaining() == 0 && state.towels > 0 {
        log::info!("All towels collected! Final score: {}", state.score);
        state.phase = GamePhase::Victory;
        state.emit(GameEvent::Victory);
    }

    state.prune_scene_scope();
}

fn resolve_contact(state: &mut GameState, contact: Contact) {
    let player_id = state.player_id();
    match contact {
        Contact::EnemyTouch { enemy } => {
            let Some((damage, knockback)) = state
                .actor(enemy)
                .filter(|e| !e.is_dead())
                .zip(state.player())
                .map(|(e, p)| (e.contact_damage, e.knockback_for(p.pos)))
            else {
                return;
            };
            if let DamageOutcome::Hurt { .. } = state.damage_actor(player_id, damage) {
                state.emit(GameEvent::Knockback {
                    actor: player_id,
                    vel: knockback,
                });
            }
        }
        Contact::EnemyHit { enemy, amount } => {
            state.damage_actor(enemy, amount);
        }
        Contact::Poetry { projectile } => {
            let damage = match state.transient(projectile).map(|t| t.kind) {
                Some(TransientKind::Poetry { damage, .. }) => damage,
                _ => return,
            };
            state.despawn_transient(projectile);
            state.damage_actor(player_id, damage);

            let text = quotes::vogon_poetry_line(&mut state.rng).to_string();
            if let Some(player) = state.player() {
                let pos = player.pos - Vec2::new(0.0, 50.0);
                state.emit(GameEvent::PoetryLine { text, pos });
            }
        }
        Contact::Hazard { hazard } => {
            if state.despawn_transient(hazard) {
                let damage = state.tuning.hazard_damage;
                state.damage_actor(player_id, damage);
            }
        }
        Contact::HazardLanded { hazard } => {
            state.despawn_transient(hazard);
        }
        Contact::Towel { collectible } => {
            state.collect(collectible);
        }
    }
}

/// Fire every timer whose deadline has passed, in deadline order
pub fn fire_due_timers(state: &mut GameState) {
    while let Some((_, action)) = state.timers.pop_due(state.now) {
        match action {
            ScheduledAction::EndInvulnerability { actor, deadline } => {
                state.end_invulnerability(actor, deadline);
            }
            ScheduledAction::RevertEffect { effect_id } => {
                drive::revert_effect(state, effect_id);
            }
            ScheduledAction::ApplyEffect(effect) => {
                drive::trigger_effect(state, effect);
            }
            ScheduledAction::ShowMessage(message) => {
                state.emit(GameEvent::Message(message));
            }
            ScheduledAction::ExpireTransient { id } => {
                state.despawn_transient(id);
            }
        }
    }
}

fn step_actors(state: &mut GameState, dt: f32) {
    let now = state.now;
    let player_pos = state.living_player_pos();
    let mut recitals: Vec<(EntityId, Vec2, Vec2, u32, f32)> = Vec::new();

    for actor in state.actors.iter_mut().filter(|a| !a.is_player()) {
        step_behavior(actor, player_pos, dt);

        let Some(target) = player_pos else {
            continue;
        };
        if actor.wants_to_attack(target, now) {
            if let Some(ranged) = actor.ranged.as_mut() {
                ranged.cooldown.reset(now);
                let dir = (target - actor.pos).normalize_or_zero();
                // Poetry leaves from the Vogon's mouth
                let mouth = actor.pos + Vec2::new(20.0 * crate::facing(actor.pos, target), -15.0);
                recitals.push((actor.id, mouth, dir, ranged.damage, ranged.projectile_speed));
            }
        }
    }

    for (owner, pos, dir, damage, speed) in recitals {
        log::debug!("A Vogon has unleashed poetry. May the gods have mercy.");
        state.emit(GameEvent::Sound(SoundCue::Poetry));
        state.spawn_transient(
            TransientKind::Poetry { owner, damage },
            pos,
            dir * speed,
            0.0,
            POETRY_LIFESPAN_MS,
        );
    }
}

fn step_transients(state: &mut GameState, dt: f32) {
    for t in &mut state.transients {
        t.vel.y += t.gravity * dt;
        t.pos += t.vel * dt;
    }

    // Poetry leaving the world is gone for good
    let escaped: Vec<EntityId> = state
        .transients
        .iter()
        .filter(|t| matches!(t.kind, TransientKind::Poetry { .. }))
        .filter(|t| {
            t.pos.x < 0.0 || t.pos.x > WORLD_WIDTH || t.pos.y < 0.0 || t.pos.y > WORLD_HEIGHT
        })
        .map(|t| t.id)
        .collect();
    for id in escaped {
        state.despawn_transient(id);
    }
}

/// Populate the level: towels scattered at random, Vogons on the platforms
pub fn generate_level(state: &mut GameState) {
    for _ in 0..state.tuning.total_towels {
        let x = state.rng.random_range(50.0..=750.0);
        let y = state.rng.random_range(50.0..=500.0);
        state.spawn_towel(Vec2::new(x, y));
    }

    for pos in [
        Vec2::new(300.0, 300.0),
        Vec2::new(500.0, 300.0),
        Vec2::new(200.0, 100.0),
        Vec2::new(600.0, 100.0),
    ] {
        let direction = if state.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let speed = state.rng.random_range(50.0..=100.0);
        let id = state.spawn_vogon(pos, Behavior::patrol_around(pos.x, PATROL_DISTANCE, direction));
        if let Some(vogon) = state.actor_mut(id) {
            vogon.speed = speed;
        }
    }

    log::info!(
        "Level generated: {} towels, {} Vogons",
        state.towels_remaining(),
        state.enemy_ids().len()
    );
}
