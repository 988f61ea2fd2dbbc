//! Collation parameters and their TOML file form.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid parameter: {0}")]
    Invalid(String),
}

/// Options and alignment costs for one collation request.
///
/// Costs are minimized: an identical token costs 0, a near match costs
/// `near_match_cost`, and both a mismatch and a gap cost `edit_cost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollationParams {
    /// Show reconstructed readings instead of the fragmentation placeholder
    pub keep_reconstructed: bool,
    /// Remove Hebrew vowel and cantillation marks before comparison
    pub strip_vowels: bool,
    /// Merge runs of equally-flagged columns into one column
    pub segmentation: bool,
    /// Treat orthographically close tokens as equal when aligning
    pub near_match: bool,
    /// Normalized edit distance below which two tokens near-match
    pub near_match_threshold: f32,
    pub near_match_cost: u32,
    pub edit_cost: u32,
}

impl Default for CollationParams {
    fn default() -> Self {
        Self {
            keep_reconstructed: false,
            strip_vowels: false,
            segmentation: true,
            near_match: false,
            near_match_threshold: 0.3,
            near_match_cost: 1,
            edit_cost: 2,
        }
    }
}

impl CollationParams {
    /// Parse parameters from TOML; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let params: CollationParams = toml::from_str(content)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.edit_cost == 0 {
            return Err(ConfigError::Invalid("edit_cost must be positive".into()));
        }
        if self.near_match_cost >= self.edit_cost {
            return Err(ConfigError::Invalid(format!(
                "near_match_cost ({}) must be below edit_cost ({})",
                self.near_match_cost, self.edit_cost
            )));
        }
        if !(0.0..1.0).contains(&self.near_match_threshold) {
            return Err(ConfigError::Invalid(format!(
                "near_match_threshold must lie in [0, 1), got {}",
                self.near_match_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = CollationParams::default();
        assert!(params.validate().is_ok());
        assert!(params.segmentation);
        assert!(!params.near_match);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let params = CollationParams::from_toml_str("near_match = true\nstrip_vowels = true\n").unwrap();
        assert!(params.near_match);
        assert!(params.strip_vowels);
        assert_eq!(params.edit_cost, 2);
        assert!(params.segmentation);
    }

    #[test]
    fn test_invalid_costs_rejected() {
        let err = CollationParams::from_toml_str("edit_cost = 0\nnear_match_cost = 0\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = CollationParams::from_toml_str("edit_cost = 2\nnear_match_cost = 2\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = CollationParams::from_toml_str("near_match_threshold = 1.5\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let err = CollationParams::from_toml_str("near_match = maybe");
        assert!(matches!(err, Err(ConfigError::Toml(_))));
    }
}
