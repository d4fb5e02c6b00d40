//! Evaluation configuration.

use serde::{Deserialize, Serialize};

use crate::association::DEFAULT_IOU_THRESHOLD;
use crate::{Error, Result};

/// Evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Minimum IoU for a ground truth and a detection to match.
    pub iou_threshold: f64,

    /// An identity whose matched fraction is above this is mostly tracked.
    pub mostly_tracked_ratio: f64,

    /// An identity whose matched fraction is below this is mostly lost.
    pub mostly_lost_ratio: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            mostly_tracked_ratio: 0.8,
            mostly_lost_ratio: 0.2,
        }
    }
}

impl EvaluationConfig {
    /// Create a configuration with the given IoU threshold and default ratios.
    pub fn new(iou_threshold: f64) -> Self {
        Self {
            iou_threshold,
            ..Self::default()
        }
    }

    /// Check that all thresholds lie in `[0, 1]` and the ratios are ordered.
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold must be in [0, 1], got {}",
                self.iou_threshold
            )));
        }

        if !unit.contains(&self.mostly_tracked_ratio) || !unit.contains(&self.mostly_lost_ratio) {
            return Err(Error::InvalidConfig(format!(
                "classification ratios must be in [0, 1], got mostly_tracked={} mostly_lost={}",
                self.mostly_tracked_ratio, self.mostly_lost_ratio
            )));
        }

        if self.mostly_lost_ratio > self.mostly_tracked_ratio {
            return Err(Error::InvalidConfig(
                "mostly_lost_ratio must not exceed mostly_tracked_ratio".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EvaluationConfig::default();
        assert_eq!(config.iou_threshold, 0.5);
        assert_eq!(config.mostly_tracked_ratio, 0.8);
        assert_eq!(config.mostly_lost_ratio, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_keeps_default_ratios() {
        let config = EvaluationConfig::new(0.3);
        assert_eq!(config.iou_threshold, 0.3);
        assert_eq!(config.mostly_tracked_ratio, 0.8);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(EvaluationConfig::new(1.5).validate().is_err());
        assert!(EvaluationConfig::new(-0.1).validate().is_err());
        assert!(EvaluationConfig::new(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_invalid_ratios() {
        let mut config = EvaluationConfig::default();
        config.mostly_lost_ratio = 0.9;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = EvaluationConfig::default();
        config.mostly_tracked_ratio = 1.2;
        assert!(config.validate().is_err());
    }
}
