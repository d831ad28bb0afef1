//! Model Module - Stability prediction
//!
//! The trained model is a black box: a scaler plus a binary classifier,
//! described by a JSON manifest. Swapping classifier families only touches
//! `inference.rs`.

pub mod inference;
pub mod manifest;
pub mod predictor;
pub mod scaler;
pub mod threshold;

pub use inference::{InferenceError, LogisticClassifier, OnnxClassifier, StabilityClassifier};
pub use manifest::{ClassifierSpec, ManifestError, ModelManifest};
pub use predictor::{ModelInfo, PredictionResult, PredictorStatus, StabilityPredictor};
pub use scaler::StandardScaler;
pub use threshold::ThresholdConfig;
