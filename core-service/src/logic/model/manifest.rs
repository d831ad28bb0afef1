//! Model Manifest - artifacts produced by the trainer
//!
//! ```json
//! {
//!   "name": "stability-rf-v3",
//!   "feature_version": 1,
//!   "feature_names": ["g0_min", "g1_min", "..."],
//!   "threshold": 0.5,
//!   "scaler": { "mean": [...], "scale": [...] },
//!   "classifier": { "kind": "onnx", "path": "stability_model.onnx", "sha256": "..." }
//! }
//! ```
//!
//! Every failure here is fatal: a run never starts on a model it cannot trust.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::features::{layout, LayoutMismatchError, FEATURE_COUNT};
use super::inference::{InferenceError, LogisticClassifier, OnnxClassifier, StabilityClassifier};
use super::predictor::StabilityPredictor;
use super::scaler::StandardScaler;
use super::threshold::ThresholdConfig;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Decision threshold {0} outside [0, 1]")]
    InvalidThreshold(f32),

    #[error(transparent)]
    Model(#[from] InferenceError),
}

/// Classifier artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Onnx {
        path: PathBuf,
        #[serde(default)]
        sha256: Option<String>,
    },
    Logistic {
        coefficients: Vec<f32>,
        intercept: f32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default)]
    pub name: Option<String>,
    pub feature_version: u8,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
    pub scaler: StandardScaler,
    pub classifier: ClassifierSpec,

    /// Directory relative artifact paths resolve against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl ModelManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut manifest: ModelManifest = serde_json::from_str(&text)?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        log::info!(
            "Loaded model manifest {} ({} features)",
            path.display(),
            manifest.feature_names.len()
        );
        Ok(manifest)
    }

    pub fn from_json(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let mut manifest: ModelManifest = serde_json::from_str(text)?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| match &self.classifier {
            ClassifierSpec::Onnx { path, .. } => path.display().to_string(),
            ClassifierSpec::Logistic { .. } => "logistic".to_string(),
        })
    }

    /// Feature names and scaler must agree with the compiled-in layout
    pub fn validate(&self) -> Result<(), ManifestError> {
        layout::validate_names(self.feature_version, self.feature_names.as_slice())?;
        self.scaler.validate(FEATURE_COUNT)?;

        if let Some(t) = self.threshold {
            ThresholdConfig::new(t).ok_or(ManifestError::InvalidThreshold(t))?;
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Build the predictor; `threshold_override` wins over the manifest value
    pub fn build_predictor(&self, threshold_override: Option<f32>) -> Result<StabilityPredictor, ManifestError> {
        self.validate()?;

        let threshold = match threshold_override.or(self.threshold) {
            Some(t) => ThresholdConfig::new(t).ok_or(ManifestError::InvalidThreshold(t))?,
            None => ThresholdConfig::default(),
        };

        let (classifier, checksum): (Box<dyn StabilityClassifier>, Option<String>) = match &self.classifier {
            ClassifierSpec::Onnx { path, sha256 } => {
                let model_path = self.resolve(path);
                let checksum = match sha256 {
                    Some(expected) => Some(verify_checksum(&model_path, expected)?),
                    None => {
                        log::warn!("No checksum for {}, skipping verification", model_path.display());
                        None
                    }
                };
                let classifier = OnnxClassifier::load(&model_path, FEATURE_COUNT)?;
                (Box::new(classifier) as Box<dyn StabilityClassifier>, checksum)
            }
            ClassifierSpec::Logistic { coefficients, intercept } => {
                let classifier = LogisticClassifier::new(coefficients.clone(), *intercept);
                (Box::new(classifier) as Box<dyn StabilityClassifier>, None)
            }
        };

        let predictor = StabilityPredictor::new(
            self.display_name(),
            self.scaler.clone(),
            classifier,
            threshold,
        )?;

        Ok(predictor.with_checksum(checksum))
    }
}

/// SHA-256 of a file, lowercase hex
pub fn file_sha256(path: &Path) -> Result<String, ManifestError> {
    let bytes = fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Compare a file's SHA-256 against the expected hex digest
pub fn verify_checksum(path: &Path, expected: &str) -> Result<String, ManifestError> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(ManifestError::Checksum {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    log::info!("Checksum verified for {}", path.display());
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::FEATURE_LAYOUT;
    use tempfile::TempDir;

    fn logistic_manifest(names: &[&str]) -> String {
        serde_json::json!({
            "name": "unit",
            "feature_version": 1,
            "feature_names": names,
            "threshold": 0.6,
            "scaler": { "mean": vec![0.0; names.len()], "scale": vec![1.0; names.len()] },
            "classifier": { "kind": "logistic", "coefficients": vec![0.0; names.len()], "intercept": 0.0 }
        })
        .to_string()
    }

    #[test]
    fn test_logistic_manifest_builds() {
        let manifest = ModelManifest::from_json(&logistic_manifest(FEATURE_LAYOUT), ".").unwrap();
        let predictor = manifest.build_predictor(None).unwrap();
        assert_eq!(predictor.info().kind, "logistic");
        assert_eq!(predictor.threshold().decision_threshold, 0.6);
    }

    #[test]
    fn test_threshold_override_wins() {
        let manifest = ModelManifest::from_json(&logistic_manifest(FEATURE_LAYOUT), ".").unwrap();
        let predictor = manifest.build_predictor(Some(0.3)).unwrap();
        assert_eq!(predictor.threshold().decision_threshold, 0.3);

        assert!(matches!(
            manifest.build_predictor(Some(2.0)),
            Err(ManifestError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_reordered_features_rejected() {
        let mut names: Vec<&str> = FEATURE_LAYOUT.to_vec();
        names.swap(2, 3);
        let manifest = ModelManifest::from_json(&logistic_manifest(&names), ".").unwrap();
        assert!(matches!(manifest.validate(), Err(ManifestError::Layout(_))));
    }

    #[test]
    fn test_missing_onnx_artifact_is_fatal() {
        let text = serde_json::json!({
            "feature_version": 1,
            "feature_names": FEATURE_LAYOUT,
            "scaler": { "mean": vec![0.0; FEATURE_COUNT], "scale": vec![1.0; FEATURE_COUNT] },
            "classifier": { "kind": "onnx", "path": "missing.onnx" }
        })
        .to_string();
        let manifest = ModelManifest::from_json(&text, "/nonexistent").unwrap();
        assert!(matches!(
            manifest.build_predictor(None),
            Err(ManifestError::Model(InferenceError::ModelNotFound(_)))
        ));
    }

    #[test]
    fn test_checksum_verification() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.onnx");
        fs::write(&path, b"not really a model").unwrap();

        let digest = file_sha256(&path).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(verify_checksum(&path, &digest.to_uppercase()).is_ok());
        assert!(matches!(
            verify_checksum(&path, "00ff"),
            Err(ManifestError::Checksum { .. })
        ));
    }

    #[test]
    fn test_load_resolves_base_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, logistic_manifest(FEATURE_LAYOUT)).unwrap();

        let manifest = ModelManifest::load(&path).unwrap();
        assert_eq!(manifest.resolve(Path::new("m.onnx")), dir.path().join("m.onnx"));
        assert_eq!(manifest.display_name(), "unit");
    }
}
