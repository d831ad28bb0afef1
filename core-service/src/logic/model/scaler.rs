//! Input scaler fitted at training time
//!
//! Same semantics as sklearn's `StandardScaler`: `(x - mean) / scale`, with a
//! zero scale treated as 1.0.

use serde::{Deserialize, Serialize};

use super::inference::InferenceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl StandardScaler {
    /// Pass-through scaler for `n` features
    pub fn identity(n: usize) -> Self {
        Self {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check parameter shapes against the expected input width
    pub fn validate(&self, expected: usize) -> Result<(), InferenceError> {
        if self.mean.len() != self.scale.len() {
            return Err(InferenceError::InvalidScaler(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected,
                actual: self.mean.len(),
            });
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidScaler("non-finite parameter".to_string()));
        }
        Ok(())
    }

    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if features.len() != self.n_features() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.n_features(),
                actual: features.len(),
            });
        }

        Ok(features.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}
