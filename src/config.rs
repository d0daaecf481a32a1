//! Configuration for the store, retrieval and the recommender facade.
//!
//! Every struct has a `Default` and deserializes with missing fields filled
//! from it, so a partial JSON document is a valid configuration:
//!
//! ```rust
//! use decayrank::config::RecommenderConfig;
//!
//! let config = RecommenderConfig::from_json_str(r#"{"store": {"decay_in_days": 7.0}}"#).unwrap();
//! assert_eq!(config.store.max_value, 10.0);
//! assert_eq!(config.store.decay_in_days, Some(7.0));
//! ```

use crate::error::{RecError, Result};
use serde::{Deserialize, Serialize};

/// Interaction store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Lower clip bound for accumulated values.
    pub min_value: f32,
    /// Upper clip bound for accumulated values. Must exceed `min_value`.
    pub max_value: f32,
    /// Half-life in days. `None` disables decay.
    pub decay_in_days: Option<f64>,
    /// Derive the per-day rate as `2^(-1/half_life)` instead of the
    /// linearized `1 - ln(2)/half_life`.
    pub exact_half_life: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_value: -5.0,
            max_value: 10.0,
            decay_in_days: None,
            exact_half_life: false,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_value.is_finite() || !self.max_value.is_finite() {
            return Err(RecError::Configuration(format!(
                "bounds must be finite (min_value={}, max_value={})",
                self.min_value, self.max_value
            )));
        }
        if self.max_value <= self.min_value {
            return Err(RecError::Configuration(format!(
                "max_value should be greater than min_value ({} > {})",
                self.max_value, self.min_value
            )));
        }
        Ok(())
    }
}

/// Query-time retrieval options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Exclude items the user already interacted with from recommendations.
    pub filter_interacted: bool,
    /// Divide similar-item scores by the candidate vector norm.
    pub normalize_similar: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            filter_interacted: true,
            normalize_similar: true,
        }
    }
}

/// Top-level configuration for [`crate::recommender::Recommender`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    /// Ingest in overwrite (upsert) mode instead of accumulate-then-clip.
    pub upsert: bool,
}

impl RecommenderConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.store.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let config = StoreConfig::default();
        assert_eq!(config.min_value, -5.0);
        assert_eq!(config.max_value, 10.0);
        assert!(config.decay_in_days.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_bounds_rejected() {
        let config = StoreConfig {
            min_value: 3.0,
            max_value: 3.0,
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecError::Configuration(_))));
    }

    #[test]
    fn json_partial_document_uses_defaults() {
        let config =
            RecommenderConfig::from_json_str(r#"{"upsert": true, "retrieval": {"filter_interacted": false}}"#)
                .unwrap();
        assert!(config.upsert);
        assert!(!config.retrieval.filter_interacted);
        assert!(config.retrieval.normalize_similar);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn json_with_bad_bounds_is_configuration_error() {
        let err = RecommenderConfig::from_json_str(r#"{"store": {"min_value": 1.0, "max_value": 0.0}}"#)
            .unwrap_err();
        assert!(matches!(err, RecError::Configuration(_)));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let err = RecommenderConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, RecError::Json(_)));
    }
}
