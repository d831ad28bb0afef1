//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema shared with the trained model.**
//!
//! ## Rules
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The scaler and classifier were fitted on columns in exactly this order.
//! A manifest or dataset that disagrees is rejected before any reading is
//! scored.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Per-gate ToF minimum (0-2) ===
    "g0_min",                // 0: Gate 0 minimum distance (mm)
    "g1_min",                // 1: Gate 1 minimum distance (mm), drives ground truth
    "g2_min",                // 2: Gate 2 minimum distance (mm)

    // === Per-gate ToF mean (3-5) ===
    "g0_mean",               // 3
    "g1_mean",               // 4
    "g2_mean",               // 5

    // === Magnetometer (6-7) ===
    "mag_norm",              // 6: |B| over the window
    "mag_norm_diff",         // 7: first difference of mag_norm

    // === ToF aggregates (8-10) ===
    "tof_min_all",           // 8
    "tof_mean_all",          // 9
    "tof_mean_all_diff",     // 10: first difference of tof_mean_all
];

/// Total number of features
/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 11;

/// Feature used to derive ground-truth occupancy
pub const OCCUPANCY_FEATURE: &str = "g1_min";

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of a feature layout
pub fn compute_layout_hash(version: u8, names: &[&str]) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[version]);

    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Hash of the compiled-in layout
pub fn layout_hash() -> u32 {
    compute_layout_hash(FEATURE_VERSION, FEATURE_LAYOUT)
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub occupancy_feature: String,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
            occupancy_feature: OCCUPANCY_FEATURE.to_string(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a feature layout doesn't match the compiled-in one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version,
            self.expected_hash,
            self.actual_version,
            self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Validate an incoming version/hash pair
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

/// Validate an ordered list of feature names (manifest, CSV header)
pub fn validate_names<S: AsRef<str>>(version: u8, names: &[S]) -> Result<(), LayoutMismatchError> {
    let refs: Vec<&str> = names.iter().map(|s| s.as_ref()).collect();
    validate_layout(version, compute_layout_hash(version, &refs))
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================
