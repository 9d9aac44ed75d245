//! Game state and core simulation types
//!
//! Everything the simulation touches lives in [`GameState`]. Side effects the
//! host must render or play are pushed to `events` and drained once per frame.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorKind, Behavior, DamageOutcome, EntityId};
use super::drive::ImprobabilityDrive;
use super::effects::ImprobableEffect;
use super::modifiers::WorldModifiers;
use super::quotes::QuoteManager;
use super::timers::{TimerHandle, TimerQueue, TimerScope};
use crate::settings::{Character, Settings};
use crate::tuning::Tuning;
use crate::{Millis, consts::*};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    /// Every towel collected
    Victory,
    /// Player died
    GameOver,
}

/// Sounds the host should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Damage,
    Collect,
    Poetry,
    Improbability,
    /// Louder improbability cue for the milestone
    ImprobabilityOverdrive,
    FortyTwo,
}

/// Collectible types (only towels so far)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectibleKind {
    #[default]
    Towel,
}

/// A pickup placed in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    pub id: EntityId,
    pub kind: CollectibleKind,
    pub pos: Vec2,
    pub collected: bool,
}

impl Collectible {
    pub fn towel(id: EntityId, pos: Vec2) -> Self {
        Self {
            id,
            kind: CollectibleKind::Towel,
            pos,
            collected: false,
        }
    }

    /// Mark as collected. Returns false if it already was.
    pub fn collect(&mut self) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        true
    }
}

/// Short-lived entities with their own expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransientKind {
    /// Vogon poetry projectile
    Poetry { owner: EntityId, damage: u32 },
    /// Falling flower pot, hurts on contact
    FlowerPot,
    /// Harmless and confused
    Whale,
    Petunias,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transient {
    pub id: EntityId,
    pub kind: TransientKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Own downward acceleration (pixels/s²)
    pub gravity: f32,
    /// Speech bubble text
    pub thought: Option<String>,
    pub expires_at: Millis,
}

impl Transient {
    pub fn is_hazard(&self) -> bool {
        matches!(
            self.kind,
            TransientKind::FlowerPot | TransientKind::Poetry { .. }
        )
    }
}

/// Spawn category, for the host to pick a sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Actor(ActorKind),
    Collectible(CollectibleKind),
    Transient(TransientKind),
}

/// Something the host should show, play or react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Sound(SoundCue),
    /// Red flash on a hit
    DamageFlash { actor: EntityId, amount: u32, health: u32 },
    InvulnerabilityStarted { actor: EntityId, until: Millis },
    InvulnerabilityEnded { actor: EntityId },
    Died { actor: EntityId },
    Knockback { actor: EntityId, vel: Vec2 },
    EnemyDefeated { actor: EntityId, score_value: u32 },
    Spawned { id: EntityId, kind: EntityKind, pos: Vec2 },
    Despawned { id: EntityId },
    Collected { id: EntityId, pos: Vec2 },
    ScoreChanged { score: u32, towels: u32 },
    /// Centered HUD message
    Message(String),
    Quote(String),
    /// Vogon verse floating up from where poetry hit
    PoetryLine { text: String, pos: Vec2 },
    EffectStarted(ImprobableEffect),
    EffectEnded(ImprobableEffect),
    ScreenFlash { duration_ms: Millis },
    MilestoneReached,
    Victory,
    GameOver,
}

/// Deferred work, fired by the timer queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// End a grace period or power-up if the deadline is still current
    EndInvulnerability { actor: EntityId, deadline: Millis },
    /// Undo an applied improbable effect
    RevertEffect { effect_id: u64 },
    /// Step of the milestone sequence
    ApplyEffect(ImprobableEffect),
    ShowMessage(String),
    /// Self-expiry of a transient entity
    ExpireTransient { id: EntityId },
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub character: Character,
    /// Game clock
    pub now: Millis,
    pub phase: GamePhase,
    pub score: u32,
    pub towels: u32,
    /// Set once the milestone sequence has fired
    pub milestone_reached: bool,
    /// Actors sorted by id, the player first
    pub actors: Vec<Actor>,
    pub collectibles: Vec<Collectible>,
    pub transients: Vec<Transient>,
    pub modifiers: WorldModifiers,
    pub timers: TimerQueue<ScheduledAction>,
    /// Timers owned by the current scene
    scene_scope: TimerScope,
    pub drive: ImprobabilityDrive,
    pub quotes: QuoteManager,
    /// Pending side effects for the host
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    player_id: EntityId,
    next_id: EntityId,
}

impl GameState {
    /// Create a new game state with the given seed and default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, Tuning::default(), &Settings::default())
    }

    pub fn with_config(seed: u64, tuning: Tuning, settings: &Settings) -> Self {
        let mut drive = ImprobabilityDrive::new(
            tuning.improbability_cooldown_ms,
            tuning.improbability_chance,
        );
        drive.enabled = settings.improbability;
        let mut quotes = QuoteManager::new(
            tuning.quote_cooldown_ms,
            tuning.quote_chance,
            &tuning.extra_quotes,
        );
        quotes.enabled = settings.quotes;

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            character: settings.character,
            now: 0,
            phase: GamePhase::Playing,
            score: 0,
            towels: 0,
            milestone_reached: false,
            actors: Vec::new(),
            collectibles: Vec::new(),
            transients: Vec::new(),
            modifiers: WorldModifiers::new(),
            timers: TimerQueue::new(),
            scene_scope: TimerScope::new(),
            drive,
            quotes,
            events: Vec::new(),
            player_id: 0,
            next_id: 1,
        };

        let id = state.next_entity_id();
        let mut player = Actor::player(id, state.character, Vec2::new(100.0, 450.0));
        player.max_health = state.tuning.player_max_health;
        player.health = player.max_health;
        player.grace_ms = state.tuning.player_grace_ms;
        state.player_id = id;
        state.actors.push(player);

        log::info!(
            "Game started with seed {} as {}. Reality stability no longer guaranteed.",
            seed,
            state.character.as_str()
        );
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Schedule `action` after `delay` ms, owned by the current scene
    pub fn schedule(&mut self, delay: Millis, action: ScheduledAction) -> TimerHandle {
        let handle = self.timers.schedule(self.now.saturating_add(delay), action);
        self.scene_scope.track(handle)
    }

    pub(crate) fn prune_scene_scope(&mut self) {
        self.scene_scope.prune(&self.timers);
    }

    pub fn player_id(&self) -> EntityId {
        self.player_id
    }

    pub fn player(&self) -> Option<&Actor> {
        self.actor(self.player_id)
    }

    pub fn player_mut(&mut self) -> Option<&mut Actor> {
        let id = self.player_id;
        self.actor_mut(id)
    }

    /// Player position if the player is alive (enemies ignore the dead)
    pub fn living_player_pos(&self) -> Option<Vec2> {
        self.player().filter(|p| !p.is_dead()).map(|p| p.pos)
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    pub fn enemy_ids(&self) -> Vec<EntityId> {
        self.actors
            .iter()
            .filter(|a| !a.is_player() && !a.is_dead())
            .map(|a| a.id)
            .collect()
    }

    /// Add an actor built with an id from [`Self::next_entity_id`]
    pub fn spawn_actor(&mut self, actor: Actor) -> EntityId {
        let id = actor.id;
        debug_assert!(
            id < self.next_id && self.actor(id).is_none(),
            "actor id {id} already in use or not allocated"
        );
        self.emit(GameEvent::Spawned {
            id,
            kind: EntityKind::Actor(actor.kind),
            pos: actor.pos,
        });
        self.actors.push(actor);
        self.actors.sort_by_key(|a| a.id);
        id
    }

    pub fn spawn_vogon(&mut self, pos: Vec2, behavior: Behavior) -> EntityId {
        let id = self.next_entity_id();
        let vogon = Actor::vogon(
            id,
            pos,
            behavior,
            self.tuning.vogon_damage,
            self.tuning.poetry_cooldown_ms,
        );
        log::debug!("A Vogon has appeared at ({}, {}). Try not to make eye contact.", pos.x, pos.y);
        self.spawn_actor(vogon)
    }

    pub fn spawn_towel(&mut self, pos: Vec2) -> EntityId {
        let id = self.next_entity_id();
        self.collectibles.push(Collectible::towel(id, pos));
        self.emit(GameEvent::Spawned {
            id,
            kind: EntityKind::Collectible(CollectibleKind::Towel),
            pos,
        });
        id
    }

    /// Spawn a transient that removes itself after `lifespan`
    pub fn spawn_transient(
        &mut self,
        kind: TransientKind,
        pos: Vec2,
        vel: Vec2,
        gravity: f32,
        lifespan: Millis,
    ) -> EntityId {
        let id = self.next_entity_id();
        let expires_at = self.now.saturating_add(lifespan);
        self.transients.push(Transient {
            id,
            kind,
            pos,
            vel,
            gravity,
            thought: None,
            expires_at,
        });
        self.schedule(lifespan, ScheduledAction::ExpireTransient { id });
        self.emit(GameEvent::Spawned {
            id,
            kind: EntityKind::Transient(kind),
            pos,
        });
        id
    }

    pub fn transient(&self, id: EntityId) -> Option<&Transient> {
        self.transients.iter().find(|t| t.id == id)
    }

    /// Remove a transient. Returns false if it was already gone.
    pub fn despawn_transient(&mut self, id: EntityId) -> bool {
        let Some(idx) = self.transients.iter().position(|t| t.id == id) else {
            return false;
        };
        self.transients.remove(idx);
        self.emit(GameEvent::Despawned { id });
        true
    }

    /// Damage an actor, scheduling the end of its grace period.
    ///
    /// Unknown, dead and invulnerable targets are ignored.
    pub fn damage_actor(&mut self, id: EntityId, amount: u32) -> DamageOutcome {
        let now = self.now;
        let Some(actor) = self.actor_mut(id) else {
            log::debug!("Ignoring damage to missing actor {}", id);
            return DamageOutcome::Ignored;
        };
        let outcome = actor.take_damage(amount, now);
        let is_player = actor.is_player();
        let score_value = actor.score_value;

        match outcome {
            DamageOutcome::Ignored => {
                log::debug!("Actor {} ignored {} damage", id, amount);
            }
            DamageOutcome::Hurt { health, grace_until } => {
                self.emit(GameEvent::DamageFlash {
                    actor: id,
                    amount,
                    health,
                });
                if is_player {
                    self.emit(GameEvent::Sound(SoundCue::Damage));
                }
                if let Some(deadline) = grace_until {
                    self.emit(GameEvent::InvulnerabilityStarted {
                        actor: id,
                        until: deadline,
                    });
                    self.schedule(
                        deadline - now,
                        ScheduledAction::EndInvulnerability { actor: id, deadline },
                    );
                }
            }
            DamageOutcome::Killed => {
                self.emit(GameEvent::DamageFlash {
                    actor: id,
                    amount,
                    health: 0,
                });
                self.emit(GameEvent::Died { actor: id });
                if is_player {
                    self.emit(GameEvent::Sound(SoundCue::Damage));
                    log::info!("Player has died. So it goes for carbon-based life forms.");
                    if self.phase == GamePhase::Playing {
                        self.phase = GamePhase::GameOver;
                        self.emit(GameEvent::GameOver);
                    }
                } else {
                    self.add_score(score_value);
                    self.emit(GameEvent::EnemyDefeated {
                        actor: id,
                        score_value,
                    });
                }
            }
        }
        outcome
    }

    /// Force an actor invulnerable for `duration`; re-granting resets the deadline
    pub fn grant_invulnerability(&mut self, id: EntityId, duration: Millis) -> Option<Millis> {
        let now = self.now;
        let deadline = self.actor_mut(id)?.grant_invulnerability(duration, now)?;
        self.emit(GameEvent::InvulnerabilityStarted {
            actor: id,
            until: deadline,
        });
        self.schedule(
            duration,
            ScheduledAction::EndInvulnerability { actor: id, deadline },
        );
        Some(deadline)
    }

    /// End invulnerability if `deadline` is still the actor's current one
    pub fn end_invulnerability(&mut self, id: EntityId, deadline: Millis) -> bool {
        let ended = self
            .actor_mut(id)
            .map(|a| a.expire_invulnerability(deadline))
            .unwrap_or(false);
        if ended {
            self.emit(GameEvent::InvulnerabilityEnded { actor: id });
        }
        ended
    }

    fn add_score(&mut self, amount: u32) {
        self.score += amount;
        self.emit(GameEvent::ScoreChanged {
            score: self.score,
            towels: self.towels,
        });
    }

    /// Score from towels alone (drives the milestone)
    pub fn towel_score(&self) -> u32 {
        self.towels * self.tuning.towel_value
    }

    /// Collect a towel. Duplicate overlap callbacks are no-ops.
    pub fn collect(&mut self, id: EntityId) -> bool {
        let Some(idx) = self.collectibles.iter().position(|c| c.id == id) else {
            log::debug!("Ignoring collect of missing collectible {}", id);
            return false;
        };
        if !self.collectibles[idx].collect() {
            return false;
        }
        let towel = self.collectibles.remove(idx);

        self.emit(GameEvent::Collected {
            id,
            pos: towel.pos,
        });
        self.emit(GameEvent::Sound(SoundCue::Collect));
        self.emit(GameEvent::Despawned { id });

        self.towels += 1;
        self.add_score(self.tuning.towel_value);

        if !self.milestone_reached && self.towel_score() >= self.tuning.milestone_score {
            self.reach_milestone();
        }
        true
    }

    fn reach_milestone(&mut self) {
        self.milestone_reached = true;
        log::info!(
            "{} points reached! The Answer to Life, the Universe, and Everything!",
            self.tuning.milestone_score
        );
        self.emit(GameEvent::MilestoneReached);
        self.emit(GameEvent::Sound(SoundCue::FortyTwo));
        self.emit(GameEvent::Message("DON'T PANIC".to_string()));
        let player = self.player_id;
        self.grant_invulnerability(player, self.tuning.milestone_invulnerability_ms);
        self.trigger_milestone_sequence();
    }

    /// Scripted chain of effects for the milestone
    pub fn trigger_milestone_sequence(&mut self) {
        super::drive::trigger_milestone_sequence(self);
    }

    /// Apply a single effect right away, scheduling its revert
    pub fn trigger_effect(&mut self, effect: ImprobableEffect) -> u64 {
        super::drive::trigger_effect(self, effect)
    }

    /// Towels still waiting to be picked up
    pub fn towels_remaining(&self) -> usize {
        self.collectibles.iter().filter(|c| !c.collected).count()
    }

    /// Tear the scene down: cancel every scene timer and drop world overrides
    pub fn teardown(&mut self) {
        let cancelled = self.scene_scope.dispose(&mut self.timers);
        self.drive.clear_pending();
        self.modifiers.clear();
        log::info!("Scene torn down, {} timers cancelled", cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_player() {
        let state = GameState::new(42);
        let player = state.player().unwrap();
        assert_eq!(player.health, PLAYER_MAX_HEALTH);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.actors.len(), 1);
    }

    #[test]
    fn test_grace_period_ends_exactly_on_deadline() {
        let mut state = GameState::new(1);
        let id = state.player_id();
        state.now = 500;
        state.damage_actor(id, 20);
        assert!(state.player().unwrap().is_invulnerable());

        // One ms early: still due nothing
        assert!(state.timers.pop_due(1499).is_none());
        let (_, action) = state.timers.pop_due(1500).unwrap();
        let ScheduledAction::EndInvulnerability { actor, deadline } = action else {
            panic!("expected invulnerability timer");
        };
        assert!(state.end_invulnerability(actor, deadline));
        assert!(!state.player().unwrap().is_invulnerable());
    }

    #[test]
    fn test_double_collect_is_noop() {
        let mut state = GameState::new(1);
        let towel = state.spawn_towel(Vec2::new(10.0, 10.0));
        assert!(state.collect(towel));
        assert!(!state.collect(towel));
        assert_eq!(state.towels, 1);
        assert_eq!(state.score, TOWEL_VALUE);
    }

    #[test]
    fn test_player_death_ends_game_once() {
        let mut state = GameState::new(1);
        let id = state.player_id();
        state.player_mut().unwrap().health = 15;
        assert_eq!(state.damage_actor(id, 20), DamageOutcome::Killed);
        assert_eq!(state.damage_actor(id, 50), DamageOutcome::Ignored);

        let events = state.drain_events();
        let deaths = events.iter().filter(|e| matches!(e, GameEvent::Died { .. })).count();
        assert_eq!(deaths, 1);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.player().unwrap().health, 0);
    }

    #[test]
    fn test_enemy_kill_awards_score() {
        let mut state = GameState::new(1);
        let v = state.spawn_vogon(Vec2::new(300.0, 300.0), Behavior::Stationary);
        state.damage_actor(v, 100);
        state.damage_actor(v, 100);
        assert!(state.actor(v).unwrap().is_dead());
        assert_eq!(state.score, VOGON_SCORE_VALUE);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already in use")]
    fn test_spawn_actor_rejects_duplicate_id() {
        let mut state = GameState::new(1);
        let player = state.player_id();
        state.spawn_actor(Actor::enemy(player, Vec2::ZERO, Behavior::Stationary));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not allocated")]
    fn test_spawn_actor_rejects_unallocated_id() {
        let mut state = GameState::new(1);
        state.spawn_actor(Actor::enemy(50, Vec2::ZERO, Behavior::Stationary));
    }

    #[test]
    fn test_permanent_invulnerability_saturates() {
        let mut state = GameState::new(1);
        let id = state.player_id();
        state.now = 100;
        assert_eq!(state.grant_invulnerability(id, Millis::MAX), Some(Millis::MAX));
        assert_eq!(state.timers.next_deadline(), Some(Millis::MAX));
        assert_eq!(state.damage_actor(id, 10), DamageOutcome::Ignored);
    }

    #[test]
    fn test_damage_to_missing_actor_ignored() {
        let mut state = GameState::new(1);
        assert_eq!(state.damage_actor(999, 10), DamageOutcome::Ignored);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_teardown_cancels_scene_timers() {
        let mut state = GameState::new(1);
        let id = state.player_id();
        state.grant_invulnerability(id, 10_000);
        state.trigger_effect(ImprobableEffect::SlowMotion);
        assert!(!state.timers.is_empty());

        state.teardown();
        assert!(state.timers.is_empty());
        assert_eq!(state.modifiers.time_scale(), 1.0);
    }
}
