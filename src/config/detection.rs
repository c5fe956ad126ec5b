//! Detection configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::detection::{ContextTuning, FusionWeights};
use crate::domain::engagement::DetectionThresholds;
use crate::domain::foundation::ValidationError as FieldError;

/// Scoring thresholds, fusion weights and history window
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Engage at or above this fused confidence
    #[serde(default = "default_scam_threshold")]
    pub scam_threshold: f64,

    /// Extraction-focused mode and artifact completeness
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f64,

    /// Prior turns used by classification and contextual scoring
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub weights: FusionWeights,

    #[serde(default)]
    pub context: ContextTuning,
}

impl DetectionConfig {
    pub fn thresholds(&self) -> DetectionThresholds {
        DetectionThresholds {
            scam_threshold: self.scam_threshold,
            high_confidence_threshold: self.high_confidence_threshold,
        }
    }

    /// Validate detection configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("scam_threshold", self.scam_threshold),
            ("high_confidence_threshold", self.high_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FieldError::invalid_format(field, "must be within [0, 1]").into());
            }
        }
        if self.high_confidence_threshold < self.scam_threshold {
            return Err(ValidationError::ThresholdOrder);
        }
        if self.history_window == 0 || self.history_window > 50 {
            return Err(
                FieldError::out_of_range("history_window", 1, 50, self.history_window as i64)
                    .into(),
            );
        }
        self.weights.validate()?;
        self.context.validate()?;
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scam_threshold: default_scam_threshold(),
            high_confidence_threshold: default_high_confidence_threshold(),
            history_window: default_history_window(),
            weights: FusionWeights::default(),
            context: ContextTuning::default(),
        }
    }
}

fn default_scam_threshold() -> f64 {
    0.7
}

fn default_high_confidence_threshold() -> f64 {
    0.9
}

fn default_history_window() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.scam_threshold, 0.7);
        assert_eq!(config.high_confidence_threshold, 0.9);
        assert_eq!(config.history_window, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let config = DetectionConfig {
            scam_threshold: 0.95,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::ThresholdOrder)));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = DetectionConfig {
            high_confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::Field(_))));
    }

    #[test]
    fn test_zero_history_window_rejected() {
        let config = DetectionConfig {
            history_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
