//! Rate limiting for repeating actions
//!
//! Poetry attacks, improbable events and quotes all share the same rule:
//! at least `min_interval` must pass between two triggers.

use serde::{Deserialize, Serialize};

use crate::Millis;

/// "Time since last trigger, minimum interval" gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownTimer {
    /// When the timer last fired (`None` = never, always ready)
    last_trigger: Option<Millis>,
    pub min_interval: Millis,
}

impl CooldownTimer {
    pub fn new(min_interval: Millis) -> Self {
        Self {
            last_trigger: None,
            min_interval,
        }
    }

    /// Whether a trigger at `now` would be permitted
    pub fn is_ready(&self, now: Millis) -> bool {
        match self.last_trigger {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.min_interval,
        }
    }

    /// Fire the timer if the interval has elapsed.
    ///
    /// Returns `false` without touching the clock otherwise.
    pub fn try_trigger(&mut self, now: Millis) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        self.last_trigger = Some(now);
        true
    }

    /// Move the clock to an arbitrary point (used for shortened retries)
    pub fn reset(&mut self, at: Millis) {
        self.last_trigger = Some(at);
    }

    /// Time left until the next trigger is permitted
    pub fn remaining(&self, now: Millis) -> Millis {
        match self.last_trigger {
            None => 0,
            Some(last) => last.saturating_add(self.min_interval).saturating_sub(now),
        }
    }

    pub fn last_trigger(&self) -> Option<Millis> {
        self.last_trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_trigger_twice_within_interval() {
        let mut timer = CooldownTimer::new(3000);
        assert!(timer.try_trigger(1000));
        assert!(!timer.try_trigger(2500));
        assert!(timer.try_trigger(4000));
    }

    #[test]
    fn test_fresh_timer_is_ready() {
        let timer = CooldownTimer::new(5000);
        assert!(timer.is_ready(0));
        assert_eq!(timer.remaining(0), 0);
    }

    #[test]
    fn test_failed_trigger_has_no_side_effect() {
        let mut timer = CooldownTimer::new(1000);
        timer.try_trigger(0);
        assert!(!timer.try_trigger(999));
        assert_eq!(timer.last_trigger(), Some(0));
        assert_eq!(timer.remaining(400), 600);
    }

    #[test]
    fn test_reset_backdates_clock() {
        let mut timer = CooldownTimer::new(30_000);
        timer.try_trigger(30_000);
        // Half-interval retry
        timer.reset(60_000 - 15_000);
        assert!(!timer.is_ready(59_999));
        assert!(timer.is_ready(75_000));
    }

    proptest! {
        #[test]
        fn prop_trigger_respects_interval(
            interval in 1u64..10_000,
            start in 0u64..1_000_000,
            gap in 0u64..20_000,
        ) {
            let mut timer = CooldownTimer::new(interval);
            prop_assert!(timer.try_trigger(start));
            prop_assert_eq!(timer.try_trigger(start + gap), gap >= interval);
        }
    }
}
