//! Occasional words of wisdom from the Guide, and the Vogon verse that
//! lands with every poetry hit

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cooldown::CooldownTimer;
use crate::Millis;

const BUILTIN_QUOTES: &[&str] = &[
    "In the beginning, the universe was created. This has made a lot of people very angry and been widely regarded as a bad move.",
    "Don't Panic!",
    "A towel is about the most massively useful thing an interstellar hitchhiker can have.",
    "Time is an illusion. Lunchtime doubly so.",
    "I'd far rather be happy than right any day.",
    "For a moment, nothing happened. Then, after a second or so, nothing continued to happen.",
    "It is a mistake to think you can solve any major problems just with potatoes.",
    "This must be Thursday. I never could get the hang of Thursdays.",
    "The ships hung in the sky in much the same way that bricks don't.",
    "The Answer to the Ultimate Question of Life, The Universe, and Everything is...42.",
];

/// Lines shown when Vogon poetry hits the player
pub const VOGON_POETRY: &[&str] = &[
    "Oh fetid grobblings of a putrid sun!",
    "Moist is the moonlight on decaying blurgs",
    "My love is like a festering bureaucratic form",
    "Ode to a small lump of green putty I found in my armpit one midsummer morning",
    "The plurdled gabbleblotchits on a lurgid bee",
    "As the Ravenous Bugblatter Beast of Traal once said to me...",
    "Oh the rancid pustules of my seething bowels",
];

/// Pick a line of Vogon poetry
pub fn vogon_poetry_line(rng: &mut impl Rng) -> &'static str {
    VOGON_POETRY[rng.random_range(0..VOGON_POETRY.len())]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteManager {
    cooldown: CooldownTimer,
    chance: f64,
    quotes: Vec<String>,
    pub enabled: bool,
}

impl QuoteManager {
    pub fn new(cooldown_ms: Millis, chance: f64, extra: &[String]) -> Self {
        let mut cooldown = CooldownTimer::new(cooldown_ms);
        cooldown.reset(0);
        let mut quotes: Vec<String> = extra.to_vec();
        for q in BUILTIN_QUOTES {
            if !quotes.iter().any(|existing| existing == q) {
                quotes.push((*q).to_string());
            }
        }
        Self {
            cooldown,
            chance,
            quotes,
            enabled: true,
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Roll for a quote at `now`.
    ///
    /// A failed roll sets the clock back by half a cooldown, so the next
    /// attempt comes sooner than a full interval.
    pub fn update(&mut self, now: Millis, rng: &mut impl Rng) -> Option<&str> {
        if !self.enabled || self.quotes.is_empty() || !self.cooldown.is_ready(now) {
            return None;
        }

        if rng.random::<f64>() < self.chance {
            self.cooldown.reset(now);
            let idx = rng.random_range(0..self.quotes.len());
            let quote = self.quotes[idx].as_str();
            log::info!("Displaying quote: \"{}\"", quote);
            Some(quote)
        } else {
            self.cooldown
                .reset(now.saturating_sub(self.cooldown.min_interval / 2));
            None
        }
    }

    /// Quotes mentioning 42 get extra fanfare from the host
    pub fn is_special(quote: &str) -> bool {
        quote.contains("42")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_no_quote_before_cooldown() {
        let mut q = QuoteManager::new(30_000, 1.0, &[]);
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(q.update(29_999, &mut rng).is_none());
        assert!(q.update(30_000, &mut rng).is_some());
        assert!(q.update(45_000, &mut rng).is_none());
    }

    #[test]
    fn test_miss_retries_after_half_interval() {
        let mut q = QuoteManager::new(30_000, 0.0, &[]);
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(q.update(30_000, &mut rng).is_none());
        // Clock now sits at 15_000, so the next roll is allowed at 45_000
        q.chance = 1.0;
        assert!(q.update(44_999, &mut rng).is_none());
        assert!(q.update(45_000, &mut rng).is_some());
    }

    #[test]
    fn test_extra_quotes_deduplicated() {
        let q = QuoteManager::new(1, 1.0, &["Don't Panic!".to_string()]);
        assert_eq!(q.len(), BUILTIN_QUOTES.len());
    }

    #[test]
    fn test_poetry_lines_drawn_from_rng() {
        let mut a = Pcg32::seed_from_u64(3);
        let mut b = Pcg32::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let line = vogon_poetry_line(&mut a);
            assert_eq!(line, vogon_poetry_line(&mut b));
            seen.insert(line);
        }
        assert_eq!(seen.len(), VOGON_POETRY.len());
    }

    #[test]
    fn test_disabled_is_silent() {
        let mut q = QuoteManager::new(0, 1.0, &[]);
        q.enabled = false;
        let mut rng = Pcg32::seed_from_u64(7);
        assert!(q.update(100_000, &mut rng).is_none());
        assert!(QuoteManager::is_special(BUILTIN_QUOTES[9]));
    }
}
