//! Damageable actors: the player and the enemies chasing them
//!
//! Enemy variety is expressed as data rather than subtypes: every actor
//! carries a [`Behavior`] tag and an optional [`RangedAttack`] capability,
//! and movement is dispatched through [`BEHAVIOR_TABLE`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cooldown::CooldownTimer;
use crate::consts::*;
use crate::settings::Character;
use crate::{Millis, facing};

pub type EntityId = u32;

/// What kind of actor this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Player(Character),
    Vogon,
    Generic,
}

/// Damage state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vitality {
    Vulnerable,
    /// Ignores damage until the deadline passes
    Invulnerable { until: Millis },
    /// Terminal
    Dead,
}

/// Result of a damage attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Invulnerable or already dead, nothing changed
    Ignored,
    /// Health dropped; `grace_until` is set when a grace period started
    Hurt { health: u32, grace_until: Option<Millis> },
    /// This hit was fatal
    Killed,
}

/// Movement pattern tag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Walk back and forth between two x bounds
    Patrol { min_x: f32, max_x: f32, direction: f32 },
    /// Chase the player while within range
    Follow { range: f32 },
    /// Stand still (may still attack)
    Stationary,
}

impl Behavior {
    pub fn patrol_around(x: f32, distance: f32, direction: f32) -> Self {
        Behavior::Patrol {
            min_x: x - distance,
            max_x: x + distance,
            direction,
        }
    }

    fn table_index(&self) -> usize {
        match self {
            Behavior::Patrol { .. } => 0,
            Behavior::Follow { .. } => 1,
            Behavior::Stationary => 2,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "patrol" => Some(Behavior::Patrol {
                min_x: 0.0,
                max_x: 0.0,
                direction: 1.0,
            }),
            "follow" => Some(Behavior::Follow { range: FOLLOW_RANGE }),
            "stationary" => Some(Behavior::Stationary),
            _ => None,
        }
    }
}

/// Projectile attack capability (Vogon poetry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangedAttack {
    pub cooldown: CooldownTimer,
    pub range: f32,
    pub damage: u32,
    pub projectile_speed: f32,
}

impl RangedAttack {
    pub fn poetry(damage: u32, cooldown_ms: Millis) -> Self {
        let mut cooldown = CooldownTimer::new(cooldown_ms);
        // First recital waits a full cooldown
        cooldown.reset(0);
        Self {
            cooldown,
            range: POETRY_RANGE,
            damage,
            projectile_speed: POETRY_SPEED,
        }
    }
}

/// A damageable entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    pub kind: ActorKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub vitality: Vitality,
    /// Invulnerability window after a non-fatal hit (0 = none)
    pub grace_ms: Millis,
    pub behavior: Behavior,
    pub ranged: Option<RangedAttack>,
    pub speed: f32,
    pub can_fly: bool,
    /// Damage dealt to the player on touch
    pub contact_damage: u32,
    /// Points awarded when defeated
    pub score_value: u32,
    /// Active babel-fish transformations
    #[serde(default)]
    pub transforms: u32,
}

impl Actor {
    pub fn player(id: EntityId, character: Character, pos: Vec2) -> Self {
        Self {
            id,
            kind: ActorKind::Player(character),
            pos,
            vel: Vec2::ZERO,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            vitality: Vitality::Vulnerable,
            grace_ms: PLAYER_GRACE_MS,
            behavior: Behavior::Stationary,
            ranged: None,
            speed: 200.0,
            can_fly: false,
            contact_damage: 0,
            score_value: 0,
            transforms: 0,
        }
    }

    pub fn enemy(id: EntityId, pos: Vec2, behavior: Behavior) -> Self {
        Self {
            id,
            kind: ActorKind::Generic,
            pos,
            vel: Vec2::ZERO,
            health: ENEMY_MAX_HEALTH,
            max_health: ENEMY_MAX_HEALTH,
            vitality: Vitality::Vulnerable,
            grace_ms: 0,
            behavior,
            ranged: None,
            speed: ENEMY_SPEED,
            can_fly: false,
            contact_damage: ENEMY_CONTACT_DAMAGE,
            score_value: ENEMY_SCORE_VALUE,
            transforms: 0,
        }
    }

    pub fn vogon(
        id: EntityId,
        pos: Vec2,
        behavior: Behavior,
        poetry_damage: u32,
        poetry_cooldown_ms: Millis,
    ) -> Self {
        Self {
            kind: ActorKind::Vogon,
            health: VOGON_MAX_HEALTH,
            max_health: VOGON_MAX_HEALTH,
            contact_damage: ENEMY_CONTACT_DAMAGE,
            score_value: VOGON_SCORE_VALUE,
            ranged: Some(RangedAttack::poetry(poetry_damage, poetry_cooldown_ms)),
            ..Self::enemy(id, pos, behavior)
        }
    }

    pub fn with_health(mut self, health: u32) -> Self {
        self.max_health = self.max_health.max(health);
        self.health = health;
        self
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, ActorKind::Player(_))
    }

    pub fn is_dead(&self) -> bool {
        self.vitality == Vitality::Dead
    }

    pub fn is_invulnerable(&self) -> bool {
        matches!(self.vitality, Vitality::Invulnerable { .. })
    }

    pub fn invulnerable_until(&self) -> Option<Millis> {
        match self.vitality {
            Vitality::Invulnerable { until } => Some(until),
            _ => None,
        }
    }

    /// Health as 0..=1 for the HUD bar
    pub fn health_fraction(&self) -> f32 {
        self.health as f32 / self.max_health.max(1) as f32
    }

    /// Apply a hit at game time `now`.
    ///
    /// Invulnerable and dead actors ignore damage: several sources may land
    /// in the same physics step. A grace period whose deadline has passed no
    /// longer protects, even before its expiry timer has run.
    pub fn take_damage(&mut self, amount: u32, now: Millis) -> DamageOutcome {
        match self.vitality {
            Vitality::Dead => return DamageOutcome::Ignored,
            Vitality::Invulnerable { until } if now < until => return DamageOutcome::Ignored,
            Vitality::Invulnerable { .. } | Vitality::Vulnerable => {}
        }

        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.vitality = Vitality::Dead;
            self.vel = Vec2::ZERO;
            return DamageOutcome::Killed;
        }

        let grace_until = (self.grace_ms > 0).then(|| {
            let until = now.saturating_add(self.grace_ms);
            self.vitality = Vitality::Invulnerable { until };
            until
        });
        DamageOutcome::Hurt {
            health: self.health,
            grace_until,
        }
    }

    /// Force invulnerability for `duration`. Re-granting resets the deadline.
    ///
    /// Returns the new deadline, or `None` for a dead actor.
    pub fn grant_invulnerability(&mut self, duration: Millis, now: Millis) -> Option<Millis> {
        if self.is_dead() {
            return None;
        }
        let until = now.saturating_add(duration);
        self.vitality = Vitality::Invulnerable { until };
        Some(until)
    }

    /// End invulnerability if `deadline` is still the current one.
    ///
    /// A stale deadline (superseded by a later grant) or a dead actor is left alone.
    pub fn expire_invulnerability(&mut self, deadline: Millis) -> bool {
        match self.vitality {
            Vitality::Invulnerable { until } if until == deadline => {
                self.vitality = Vitality::Vulnerable;
                true
            }
            _ => false,
        }
    }

    pub fn heal(&mut self, amount: u32) {
        if !self.is_dead() {
            self.health = (self.health + amount).min(self.max_health);
        }
    }

    pub fn is_transformed(&self) -> bool {
        self.transforms > 0
    }

    pub fn transform(&mut self) {
        self.transforms += 1;
    }

    /// Undo one transformation. Returns true when back to normal form.
    pub fn untransform(&mut self) -> bool {
        if self.transforms == 0 {
            return false;
        }
        self.transforms -= 1;
        self.transforms == 0
    }

    /// Movement speed, reduced while swimming as a babel fish
    pub fn effective_speed(&self) -> f32 {
        if self.is_transformed() && self.is_player() {
            self.speed * 0.7
        } else {
            self.speed
        }
    }

    /// Whether the ranged attack may fire at a target `target` at time `now`
    pub fn wants_to_attack(&self, target: Vec2, now: Millis) -> bool {
        if self.is_dead() || self.is_transformed() {
            return false;
        }
        match &self.ranged {
            Some(r) => r.cooldown.is_ready(now) && self.pos.distance(target) <= r.range,
            None => false,
        }
    }

    /// Knockback applied to `player` when touching this actor
    pub fn knockback_for(&self, player: Vec2) -> Vec2 {
        Vec2::new(-facing(player, self.pos) * 200.0, -200.0)
    }
}

/// Per-behavior movement step: `(actor, player position if alive, dt seconds)`
pub type BehaviorStep = fn(&mut Actor, Option<Vec2>, f32);

/// Movement dispatch, indexed by behavior tag
pub const BEHAVIOR_TABLE: [BehaviorStep; 3] = [step_patrol, step_follow, step_stationary];

/// Run this actor's behavior for one step
pub fn step_behavior(actor: &mut Actor, player: Option<Vec2>, dt: f32) {
    if actor.is_dead() {
        return;
    }
    BEHAVIOR_TABLE[actor.behavior.table_index()](actor, player, dt);
    actor.pos += actor.vel * dt;
}

fn step_patrol(actor: &mut Actor, _player: Option<Vec2>, _dt: f32) {
    let speed = actor.effective_speed();
    if let Behavior::Patrol {
        min_x,
        max_x,
        ref mut direction,
    } = actor.behavior
    {
        if (*direction > 0.0 && actor.pos.x >= max_x)
            || (*direction < 0.0 && actor.pos.x <= min_x)
        {
            *direction = -*direction;
        }
        actor.vel.x = speed * *direction;
    }
}

fn step_follow(actor: &mut Actor, player: Option<Vec2>, _dt: f32) {
    let Behavior::Follow { range } = actor.behavior else {
        return;
    };
    let Some(target) = player else {
        actor.vel = Vec2::ZERO;
        return;
    };

    let to_player = target - actor.pos;
    if to_player.length() > range {
        actor.vel = Vec2::ZERO;
        return;
    }

    let dir = to_player.normalize_or_zero();
    let speed = actor.effective_speed();
    actor.vel.x = dir.x * speed;
    if actor.can_fly {
        actor.vel.y = dir.y * speed;
    }
}

fn step_stationary(actor: &mut Actor, _player: Option<Vec2>, _dt: f32) {
    actor.vel = Vec2::ZERO;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn player() -> Actor {
        Actor::player(1, Character::Arthur, Vec2::ZERO)
    }

    #[test]
    fn test_three_spaced_hits() {
        let mut p = player();
        let mut now = 0;
        let mut seen = Vec::new();
        for _ in 0..3 {
            match p.take_damage(20, now) {
                DamageOutcome::Hurt { health, grace_until } => {
                    seen.push(health);
                    let until = grace_until.expect("player has a grace period");
                    assert!(p.expire_invulnerability(until));
                    now = until;
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(seen, vec![80, 60, 40]);
        assert!(!p.is_dead());
    }

    #[test]
    fn test_fatal_hit_is_terminal() {
        let mut p = player().with_health(15);
        assert_eq!(p.take_damage(20, 0), DamageOutcome::Killed);
        assert_eq!(p.health, 0);
        assert!(p.is_dead());

        assert_eq!(p.take_damage(50, 5000), DamageOutcome::Ignored);
        assert_eq!(p.health, 0);
        assert_eq!(p.grant_invulnerability(1000, 5000), None);
        assert!(p.is_dead());
    }

    #[test]
    fn test_invulnerable_ignores_damage() {
        let mut p = player();
        p.take_damage(10, 0);
        assert!(p.is_invulnerable());
        assert_eq!(p.take_damage(10, 500), DamageOutcome::Ignored);
        assert_eq!(p.health, 90);
    }

    #[test]
    fn test_lapsed_grace_does_not_block_damage() {
        let mut p = player();
        p.take_damage(20, 0);
        assert_eq!(p.take_damage(20, 999), DamageOutcome::Ignored);

        // Expiry timer has not run yet, but the deadline is behind us
        assert_eq!(
            p.take_damage(20, 1008),
            DamageOutcome::Hurt {
                health: 60,
                grace_until: Some(2008)
            }
        );
        // The old expiry is stale now
        assert!(!p.expire_invulnerability(1000));
        assert!(p.is_invulnerable());
    }

    #[test]
    fn test_huge_durations_saturate() {
        let mut p = player();
        assert_eq!(p.grant_invulnerability(Millis::MAX, 5000), Some(Millis::MAX));
        assert_eq!(p.take_damage(10, Millis::MAX - 1), DamageOutcome::Ignored);

        let mut q = player();
        q.grace_ms = Millis::MAX;
        assert_eq!(
            q.take_damage(10, 10),
            DamageOutcome::Hurt {
                health: 90,
                grace_until: Some(Millis::MAX)
            }
        );
    }

    #[test]
    fn test_regrant_resets_deadline() {
        let mut p = player();
        assert_eq!(p.grant_invulnerability(10_000, 0), Some(10_000));
        assert_eq!(p.grant_invulnerability(5000, 2000), Some(7000));

        // The first grant's expiry is stale now
        assert!(!p.expire_invulnerability(10_000));
        assert!(p.is_invulnerable());
        assert!(p.expire_invulnerability(7000));
        assert!(!p.is_invulnerable());
    }

    #[test]
    fn test_enemy_has_no_grace() {
        let mut e = Actor::enemy(2, Vec2::ZERO, Behavior::Stationary);
        assert_eq!(
            e.take_damage(30, 0),
            DamageOutcome::Hurt {
                health: 70,
                grace_until: None
            }
        );
        assert!(!e.is_invulnerable());
        e.take_damage(30, 1);
        assert_eq!(e.health, 40);
    }

    #[test]
    fn test_patrol_turns_at_bounds() {
        let patrol = Behavior::patrol_around(100.0, 50.0, 1.0);
        let mut e = Actor::enemy(2, Vec2::new(100.0, 0.0), patrol);
        for _ in 0..60 {
            step_behavior(&mut e, None, 0.1);
        }
        assert!(e.pos.x <= 160.0 && e.pos.x >= 40.0);
        if let Behavior::Patrol { direction, .. } = e.behavior {
            assert!(direction == 1.0 || direction == -1.0);
        }
    }

    #[test]
    fn test_follow_only_in_range() {
        let mut e = Actor::enemy(2, Vec2::ZERO, Behavior::Follow { range: 300.0 });
        step_behavior(&mut e, Some(Vec2::new(500.0, 0.0)), 0.1);
        assert_eq!(e.vel, Vec2::ZERO);

        step_behavior(&mut e, Some(Vec2::new(200.0, 0.0)), 0.1);
        assert!(e.vel.x > 0.0);
        assert_eq!(e.vel.y, 0.0);

        step_behavior(&mut e, None, 0.1);
        assert_eq!(e.vel, Vec2::ZERO);
    }

    #[test]
    fn test_transformed_vogon_holds_fire() {
        let mut v = Actor::vogon(3, Vec2::ZERO, Behavior::Stationary, 15, 3000);
        let target = Vec2::new(100.0, 0.0);
        assert!(!v.wants_to_attack(target, 1000));
        assert!(v.wants_to_attack(target, 3000));
        v.transform();
        assert!(!v.wants_to_attack(target, 3000));
        assert!(v.untransform());
        assert!(v.wants_to_attack(target, 3000));
    }

    #[test]
    fn test_knockback_points_away() {
        let e = Actor::enemy(2, Vec2::new(100.0, 0.0), Behavior::Stationary);
        assert_eq!(e.knockback_for(Vec2::new(50.0, 0.0)), Vec2::new(-200.0, -200.0));
        assert_eq!(e.knockback_for(Vec2::new(150.0, 0.0)), Vec2::new(200.0, -200.0));
    }

    proptest! {
        #[test]
        fn prop_health_never_increases_under_damage(
            hits in proptest::collection::vec((0u32..60, 0u64..3000), 1..20),
        ) {
            let mut p = player();
            let mut now = 0;
            let mut last = p.health;
            for (amount, gap) in hits {
                now += gap;
                if let Some(until) = p.invulnerable_until() {
                    if now >= until {
                        p.expire_invulnerability(until);
                    }
                }
                p.take_damage(amount, now);
                prop_assert!(p.health <= last);
                prop_assert_eq!(p.is_dead(), p.health == 0);
                last = p.health;
            }
        }
    }
}
