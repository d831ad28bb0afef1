//! Inference Backends - ONNX Runtime + logistic fallback
//!
//! The predictor only sees `StabilityClassifier`, so any classifier family
//! exported by the trainer can sit behind it. Both backends return the
//! probability of the "state will change soon" class.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use parking_lot::Mutex;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;

/// Output name used by sklearn-onnx for class probabilities
const PROBABILITIES_OUTPUT: &str = "probabilities";

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Invalid scaler: {0}")]
    InvalidScaler(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Classifier returned invalid probability {0}")]
    InvalidProbability(f32),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Binary stability classifier over scaled features
pub trait StabilityClassifier: Send + Sync {
    /// Probability that the slot's state changes soon, in [0, 1]
    fn predict_proba(&self, scaled: &[f32]) -> Result<f32, InferenceError>;

    /// Backend name for diagnostics ("onnx", "logistic", ...)
    fn name(&self) -> &str;

    /// Input width, when the backend knows it
    fn n_features(&self) -> Option<usize> {
        None
    }
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// Classifier backed by an ONNX Runtime session
///
/// Expects a `[1, n]` float input and a `[1, 2]` (or `[1, 1]`) float
/// probability output, i.e. sklearn-onnx with zipmap disabled.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
    n_features: usize,
}

impl OnnxClassifier {
    /// Load ONNX model from file
    pub fn load(model_path: &Path, n_features: usize) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        let output_name = session.outputs.iter()
            .find(|o| o.name == PROBABILITIES_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::ModelLoad("No output defined".to_string()))?;

        log::info!("ONNX model loaded (output: {})", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            n_features,
        })
    }
}

impl StabilityClassifier for OnnxClassifier {
    fn predict_proba(&self, scaled: &[f32]) -> Result<f32, InferenceError> {
        if scaled.len() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                expected: self.n_features,
                actual: scaled.len(),
            });
        }

        let input_array = Array2::<f32>::from_shape_vec((1, self.n_features), scaled.to_vec())
            .map_err(|e| InferenceError::Inference(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Inference(format!("Inference failed: {}", e)))?;

        let output = outputs.get(&self.output_name)
            .ok_or_else(|| InferenceError::Inference("No output".to_string()))?;

        let output_tensor = output.try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Inference(format!("Extract error: {}", e)))?;

        positive_class(output_tensor.1)
    }

    fn name(&self) -> &str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }
}

/// Pick the positive-class column from a single-row probability output
fn positive_class(data: &[f32]) -> Result<f32, InferenceError> {
    match data {
        [p] => Ok(*p),
        [_, p] => Ok(*p),
        _ => Err(InferenceError::Inference(format!(
            "expected 1 or 2 probability columns, got {}",
            data.len()
        ))),
    }
}

// ============================================================================
// LOGISTIC IMPLEMENTATION
// ============================================================================

/// Linear model with sigmoid link, parameters exported by the trainer
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    coefficients: Vec<f32>,
    intercept: f32,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f32>, intercept: f32) -> Self {
        Self { coefficients, intercept }
    }
}

impl StabilityClassifier for LogisticClassifier {
    fn predict_proba(&self, scaled: &[f32]) -> Result<f32, InferenceError> {
        if scaled.len() != self.coefficients.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.coefficients.len(),
                actual: scaled.len(),
            });
        }

        let z: f32 = self.coefficients.iter()
            .zip(scaled)
            .map(|(w, x)| w * x)
            .sum::<f32>() + self.intercept;

        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn name(&self) -> &str {
        "logistic"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_zero_weights_is_half() {
        let clf = LogisticClassifier::new(vec![0.0; 3], 0.0);
        let p = clf.predict_proba(&[1.0, 2.0, 3.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_logistic_monotonic_in_weighted_input() {
        let clf = LogisticClassifier::new(vec![2.0, 0.0], -1.0);
        let low = clf.predict_proba(&[-1.0, 5.0]).unwrap();
        let high = clf.predict_proba(&[3.0, 5.0]).unwrap();
        assert!(low < 0.5);
        assert!(high > 0.5);
    }

    #[test]
    fn test_logistic_shape_mismatch() {
        let clf = LogisticClassifier::new(vec![1.0; 4], 0.0);
        let err = clf.predict_proba(&[1.0; 3]).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_positive_class_selection() {
        assert_eq!(positive_class(&[0.2, 0.8]).unwrap(), 0.8);
        assert_eq!(positive_class(&[0.3]).unwrap(), 0.3);
        assert!(positive_class(&[0.1, 0.2, 0.7]).is_err());
    }

    #[test]
    fn test_onnx_missing_file() {
        let err = OnnxClassifier::load(Path::new("/nonexistent/stability.onnx"), 11).err().unwrap();
        assert!(matches!(err, InferenceError::ModelNotFound(_)));
    }
}
