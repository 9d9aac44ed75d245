//! Data-driven game balance
//!
//! Every field falls back to the compiled default in [`crate::consts`], so a
//! tuning file only needs the keys it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Millis;
use crate::consts::*;

/// Errors from loading a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tuning: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tuning {
    /// Score per towel
    pub towel_value: u32,
    /// Towel score that triggers the milestone sequence
    pub milestone_score: u32,
    /// Towels placed at level start
    pub total_towels: usize,

    pub player_max_health: u32,
    pub player_grace_ms: Millis,
    pub milestone_invulnerability_ms: Millis,

    pub vogon_damage: u32,
    pub poetry_cooldown_ms: Millis,
    pub hazard_damage: u32,

    pub improbability_cooldown_ms: Millis,
    /// Chance per tick once the cooldown has passed
    pub improbability_chance: f64,

    pub quote_cooldown_ms: Millis,
    pub quote_chance: f64,
    /// Quotes added to the built-in list
    pub extra_quotes: Vec<String>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            towel_value: TOWEL_VALUE,
            milestone_score: ANSWER_TO_EVERYTHING,
            total_towels: TOTAL_TOWELS,
            player_max_health: PLAYER_MAX_HEALTH,
            player_grace_ms: PLAYER_GRACE_MS,
            milestone_invulnerability_ms: MILESTONE_INVULNERABILITY_MS,
            vogon_damage: VOGON_DAMAGE,
            poetry_cooldown_ms: POETRY_COOLDOWN_MS,
            hazard_damage: HAZARD_DAMAGE,
            improbability_cooldown_ms: IMPROBABILITY_COOLDOWN_MS,
            improbability_chance: IMPROBABILITY_CHANCE,
            quote_cooldown_ms: QUOTE_COOLDOWN_MS,
            quote_chance: QUOTE_CHANCE,
            extra_quotes: vec![
                "So long, and thanks for all the fish".to_string(),
            ],
        }
    }
}

impl Tuning {
    /// Parse and validate tuning JSON
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load `path` if present, otherwise compiled defaults.
    ///
    /// Parse and validation errors are logged and fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No {} found; using compiled defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        for (name, p) in [
            ("improbability_chance", self.improbability_chance),
            ("quote_chance", self.quote_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(TuningError::Invalid(format!("{name} must be within [0, 1], got {p}")));
            }
        }
        if self.player_max_health == 0 {
            return Err(TuningError::Invalid("player_max_health must be positive".into()));
        }
        if self.towel_value == 0 {
            return Err(TuningError::Invalid("towel_value must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let t = Tuning::from_json(r#"{"towel_value": 6, "improbability_chance": 0.5}"#).unwrap();
        assert_eq!(t.towel_value, 6);
        assert_eq!(t.improbability_chance, 0.5);
        assert_eq!(t.milestone_score, ANSWER_TO_EVERYTHING);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Tuning::from_json(r#"{"quote_chance": 1.5}"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Tuning::from_json("{ towel_value: ").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let t = Tuning::load_or_default("/nonexistent/tuning.json");
        assert_eq!(t, Tuning::default());
    }
}
