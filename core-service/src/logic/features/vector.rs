//! Feature Vector - Core data structure for model input
//!
//! Versioned feature vector tied to the layout in `layout.rs`.

use serde::{Deserialize, Serialize};
use super::layout::{
    FEATURE_COUNT, FEATURE_VERSION,
    layout_hash, validate_layout, LayoutMismatchError,
};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f32; FEATURE_COUNT],
}

/// Wrong number of values for the compiled-in layout
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} features, got {actual}")]
pub struct ShapeMismatch {
    pub expected: usize,
    pub actual: usize,
}

impl FeatureVector {
    /// Create a new zeroed feature vector with current version
    pub fn new() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }

    /// Create from raw values with current version
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Create from a slice; the length must match the layout exactly
    pub fn from_slice(values: &[f32]) -> Result<Self, ShapeMismatch> {
        let array: [f32; FEATURE_COUNT] = values.try_into().map_err(|_| ShapeMismatch {
            expected: FEATURE_COUNT,
            actual: values.len(),
        })?;
        Ok(Self::from_values(array))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// Set feature by name
    pub fn set_by_name(&mut self, name: &str, value: f32) -> bool {
        match super::layout::feature_index(name) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    /// Name of the first non-finite feature, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.values
            .iter()
            .position(|v| !v.is_finite())
            .and_then(super::layout::feature_name)
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for creating FeatureVector with named setters
#[derive(Default)]
pub struct FeatureVectorBuilder {
    vector: FeatureVector,
}

impl FeatureVectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate 1 minimum distance, the ground-truth feature
    pub fn g1_min(self, value: f32) -> Self {
        self.set("g1_min", value)
    }

    pub fn mag_norm(self, value: f32) -> Self {
        self.set("mag_norm", value)
    }

    /// Set feature by name; unknown names are ignored
    pub fn set(mut self, name: &str, value: f32) -> Self {
        self.vector.set_by_name(name, value);
        self
    }

    pub fn build(self) -> FeatureVector {
        self.vector
    }
}

// ============================================================================
// TESTS
// ============================================================================
