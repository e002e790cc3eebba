use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Default number of samples per slice when a whole-beat analysis misses.
pub const DEFAULT_SLICE_SIZE: usize = 512;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Pitch-class tolerance used to snap a sung note onto the target note.
    pub fn rounding_distance(self) -> u8 {
        match self {
            Difficulty::Easy => 2,
            Difficulty::Medium => 1,
            Difficulty::Hard => 0,
        }
    }
}

/// Tuning of a single player's tracker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum pitch-class distance at which a sung note counts as the target.
    pub rounding_distance: u8,
    /// Samples per slice for the fallback analysis.
    pub slice_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::default())
    }
}

impl TrackerConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        TrackerConfig {
            rounding_distance: difficulty.rounding_distance(),
            slice_size: DEFAULT_SLICE_SIZE,
        }
    }

    /// Parse a config from JSON. Missing fields fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.slice_size == 0 {
            return Err(TrackerError::InvalidSliceSize(self.slice_size));
        }
        if self.rounding_distance > 6 {
            return Err(TrackerError::InvalidRoundingDistance(self.rounding_distance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_rounding_distance() {
        assert_eq!(Difficulty::Easy.rounding_distance(), 2);
        assert_eq!(Difficulty::Medium.rounding_distance(), 1);
        assert_eq!(Difficulty::Hard.rounding_distance(), 0);
    }

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.rounding_distance, 1);
        assert_eq!(config.slice_size, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = TrackerConfig::from_json(r#"{ "rounding_distance": 2 }"#).unwrap();
        assert_eq!(config.rounding_distance, 2);
        assert_eq!(config.slice_size, DEFAULT_SLICE_SIZE);
    }

    #[test]
    fn test_from_json_rejects_zero_slice_size() {
        let result = TrackerConfig::from_json(r#"{ "slice_size": 0 }"#);
        assert!(matches!(result, Err(TrackerError::InvalidSliceSize(0))));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let result = TrackerConfig::from_json("{ not json");
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_rejects_large_rounding_distance() {
        let config = TrackerConfig {
            rounding_distance: 7,
            slice_size: 512,
        };
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidRoundingDistance(7))
        ));
    }
}
