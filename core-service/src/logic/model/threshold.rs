//! Decision Threshold Configuration
//!
//! Maps a stability probability to the "predicted change" label.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DECISION_THRESHOLD;

/// Threshold Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Probability at or above which a change is predicted (0.0 - 1.0)
    pub decision_threshold: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    /// Returns `None` when the threshold is outside [0, 1]
    pub fn new(threshold: f32) -> Option<Self> {
        (0.0..=1.0).contains(&threshold).then_some(Self {
            decision_threshold: threshold,
        })
    }

    /// Inclusive: a probability equal to the threshold is a predicted change
    pub fn is_change(&self, probability: f32) -> bool {
        probability >= self.decision_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_config() {
        let config = ThresholdConfig::default();
        assert_eq!(config.decision_threshold, 0.5);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let config = ThresholdConfig::default();
        assert!(config.is_change(0.5));
        assert!(!config.is_change(0.4999));
        assert!(config.is_change(1.0));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(ThresholdConfig::new(1.5).is_none());
        assert!(ThresholdConfig::new(-0.1).is_none());
        assert!(ThresholdConfig::new(f32::NAN).is_none());
        assert_eq!(ThresholdConfig::new(0.8).unwrap().decision_threshold, 0.8);
    }
}
