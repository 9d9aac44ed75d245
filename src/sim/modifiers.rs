//! Global world parameters touched by improbable events
//!
//! Gravity direction, time scale, camera tint and color inversion are owned
//! here and nowhere else. Each field counts its active overrides; the base
//! value comes back only when the last override is released, so two
//! overlapping effects cannot lose a restore.

use serde::{Deserialize, Serialize};

/// Physics time scale while slow motion is active
pub const SLOW_MOTION_SCALE: f32 = 0.3;
/// Camera tint applied during slow motion (blue)
pub const SLOW_MOTION_TINT: u32 = 0x0000ff;

/// A named world parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    GravityReversed,
    SlowMotion,
    ColorInverted,
}

/// Single owner of mutable world parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldModifiers {
    gravity_reversals: u32,
    slow_motion: u32,
    color_inversions: u32,
}

impl WorldModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    fn count_mut(&mut self, modifier: Modifier) -> &mut u32 {
        match modifier {
            Modifier::GravityReversed => &mut self.gravity_reversals,
            Modifier::SlowMotion => &mut self.slow_motion,
            Modifier::ColorInverted => &mut self.color_inversions,
        }
    }

    /// Number of active overrides for a parameter
    pub fn count(&self, modifier: Modifier) -> u32 {
        match modifier {
            Modifier::GravityReversed => self.gravity_reversals,
            Modifier::SlowMotion => self.slow_motion,
            Modifier::ColorInverted => self.color_inversions,
        }
    }

    pub fn is_active(&self, modifier: Modifier) -> bool {
        self.count(modifier) > 0
    }

    /// Take an override. Returns true if this changed the effective value.
    pub fn push(&mut self, modifier: Modifier) -> bool {
        let count = self.count_mut(modifier);
        *count += 1;
        *count == 1
    }

    /// Release an override. Returns true if the base value is restored.
    ///
    /// Releasing a parameter with no active override is ignored.
    pub fn pop(&mut self, modifier: Modifier) -> bool {
        let count = self.count_mut(modifier);
        if *count == 0 {
            log::debug!("Ignoring release of inactive modifier {:?}", modifier);
            return false;
        }
        *count -= 1;
        *count == 0
    }

    /// +1.0 for normal gravity, -1.0 while reversed
    pub fn gravity_sign(&self) -> f32 {
        if self.is_active(Modifier::GravityReversed) {
            -1.0
        } else {
            1.0
        }
    }

    /// Effective vertical gravity for the given base value
    pub fn gravity(&self, base: f32) -> f32 {
        base * self.gravity_sign()
    }

    pub fn time_scale(&self) -> f32 {
        if self.is_active(Modifier::SlowMotion) {
            SLOW_MOTION_SCALE
        } else {
            1.0
        }
    }

    pub fn camera_tint(&self) -> Option<u32> {
        self.is_active(Modifier::SlowMotion).then_some(SLOW_MOTION_TINT)
    }

    pub fn colors_inverted(&self) -> bool {
        self.is_active(Modifier::ColorInverted)
    }

    /// Drop every override (scene teardown)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_gravity_reversals_restore_once() {
        let mut m = WorldModifiers::new();
        assert!(m.push(Modifier::GravityReversed));
        assert!(!m.push(Modifier::GravityReversed));
        assert_eq!(m.gravity(980.0), -980.0);

        // First revert must not restore while the second is still active
        assert!(!m.pop(Modifier::GravityReversed));
        assert_eq!(m.gravity_sign(), -1.0);

        assert!(m.pop(Modifier::GravityReversed));
        assert_eq!(m.gravity(980.0), 980.0);
    }

    #[test]
    fn test_slow_motion_scale_and_tint() {
        let mut m = WorldModifiers::new();
        assert_eq!(m.time_scale(), 1.0);
        assert_eq!(m.camera_tint(), None);
        m.push(Modifier::SlowMotion);
        assert_eq!(m.time_scale(), SLOW_MOTION_SCALE);
        assert_eq!(m.camera_tint(), Some(SLOW_MOTION_TINT));
        m.pop(Modifier::SlowMotion);
        assert_eq!(m.time_scale(), 1.0);
    }

    #[test]
    fn test_pop_without_push_is_ignored() {
        let mut m = WorldModifiers::new();
        assert!(!m.pop(Modifier::ColorInverted));
        assert_eq!(m.count(Modifier::ColorInverted), 0);
        assert!(!m.colors_inverted());
    }
}
