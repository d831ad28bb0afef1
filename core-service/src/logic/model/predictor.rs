//! Stability Predictor - scaler + classifier + threshold
//!
//! Shapes are checked once when the predictor is built; a mismatch there is
//! a setup defect and never reaches the run loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::features::{FeatureVector, FEATURE_COUNT, FEATURE_VERSION};
use super::inference::{InferenceError, StabilityClassifier};
use super::scaler::StandardScaler;
use super::threshold::ThresholdConfig;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability: f32,        // 0.0 - 1.0
    pub predicted_change: bool,
    pub threshold: f32,
    pub inference_time_us: u64,
    pub method: String,
}

impl PredictionResult {
    /// Result for a known probability, bypassing inference
    pub fn from_probability(probability: f32, threshold: &ThresholdConfig) -> Self {
        Self {
            probability,
            predicted_change: threshold.is_change(probability),
            threshold: threshold.decision_threshold,
            inference_time_us: 0,
            method: "fixed".to_string(),
        }
    }
}

/// Loaded model description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: String,
    pub feature_version: u8,
    pub feature_count: usize,
    pub threshold: f32,
    pub checksum: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

/// Predictor status for status output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorStatus {
    pub model: ModelInfo,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

// ============================================================================
// PREDICTOR
// ============================================================================

pub struct StabilityPredictor {
    scaler: StandardScaler,
    classifier: Box<dyn StabilityClassifier>,
    threshold: ThresholdConfig,
    info: ModelInfo,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl StabilityPredictor {
    pub fn new(
        name: impl Into<String>,
        scaler: StandardScaler,
        classifier: Box<dyn StabilityClassifier>,
        threshold: ThresholdConfig,
    ) -> Result<Self, InferenceError> {
        scaler.validate(FEATURE_COUNT)?;

        if let Some(n) = classifier.n_features() {
            if n != FEATURE_COUNT {
                return Err(InferenceError::ShapeMismatch {
                    expected: FEATURE_COUNT,
                    actual: n,
                });
            }
        }

        let info = ModelInfo {
            name: name.into(),
            kind: classifier.name().to_string(),
            feature_version: FEATURE_VERSION,
            feature_count: FEATURE_COUNT,
            threshold: threshold.decision_threshold,
            checksum: None,
            loaded_at: Utc::now(),
        };

        Ok(Self {
            scaler,
            classifier,
            threshold,
            info,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        })
    }

    pub(crate) fn with_checksum(mut self, checksum: Option<String>) -> Self {
        self.info.checksum = checksum;
        self
    }

    /// Apply the training-time scaler
    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, InferenceError> {
        if !features.is_compatible() {
            return Err(InferenceError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: features.values.len(),
            });
        }
        self.scaler.transform(features.as_slice())
    }

    /// Positive-class probability for already scaled features
    pub fn predict_proba(&self, scaled: &[f32]) -> Result<f32, InferenceError> {
        let probability = self.classifier.predict_proba(scaled)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidProbability(probability));
        }
        Ok(probability)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        let start_time = Instant::now();

        let scaled = self.transform(features)?;
        let probability = self.predict_proba(&scaled)?;

        let inference_time_us = start_time.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(inference_time_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Ok(PredictionResult {
            probability,
            predicted_change: self.threshold.is_change(probability),
            threshold: self.threshold.decision_threshold,
            inference_time_us,
            method: self.classifier.name().to_string(),
        })
    }

    pub fn threshold(&self) -> &ThresholdConfig {
        &self.threshold
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn status(&self) -> PredictorStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        PredictorStatus {
            model: self.info.clone(),
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

impl std::fmt::Debug for StabilityPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityPredictor")
            .field("info", &self.info)
            .field("threshold", &self.threshold)
            .finish()
    }
}
