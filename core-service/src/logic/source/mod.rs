//! Feature Source - ordered per-slot readings
//!
//! A source is any iterator of `Result<Reading, SourceError>`. Recoverable
//! errors (a malformed row) are yielded in-stream so the run loop can skip
//! and count them; fatal ones (I/O, header/layout mismatch) end the run.

pub mod replay;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::features::{self, FeatureVector, LayoutMismatchError, OCCUPANCY_FEATURE};

pub use replay::{CsvFeatureSource, ReplaySource};

/// Slot identifier, e.g. `slot1`
pub type SlotId = String;

// ============================================================================
// READING
// ============================================================================

/// One timestamped observation for one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub slot_id: SlotId,
    pub timestamp: DateTime<Utc>,
    pub features: FeatureVector,
    /// Ground-truth occupancy derived from the distance threshold
    pub occupied: bool,
}

impl Reading {
    pub fn new(
        slot_id: impl Into<SlotId>,
        timestamp: DateTime<Utc>,
        features: FeatureVector,
        rule: &OccupancyRule,
    ) -> Self {
        let occupied = rule.is_occupied(&features);
        Self {
            slot_id: slot_id.into(),
            timestamp,
            features,
            occupied,
        }
    }
}

// ============================================================================
// OCCUPANCY RULE
// ============================================================================

/// Ground truth: a slot is occupied when the distance feature reads closer
/// than the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRule {
    pub feature_index: usize,
    pub threshold_mm: f32,
}

impl OccupancyRule {
    pub fn new(feature: &str, threshold_mm: f32) -> Result<Self, SourceError> {
        let feature_index = features::feature_index(feature)
            .ok_or_else(|| SourceError::Header(format!("unknown occupancy feature '{}'", feature)))?;
        Ok(Self { feature_index, threshold_mm })
    }

    /// An index outside the layout never reports occupied
    pub fn is_occupied(&self, features: &FeatureVector) -> bool {
        features
            .get(self.feature_index)
            .is_some_and(|value| value < self.threshold_mm)
    }
}

impl Default for OccupancyRule {
    fn default() -> Self {
        Self {
            feature_index: features::feature_index(OCCUPANCY_FEATURE).unwrap_or(1),
            threshold_mm: crate::constants::DEFAULT_CHANGE_THRESHOLD_MM,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error reading features: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid feature header: {0}")]
    Header(String),

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error("Malformed reading at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

impl SourceError {
    /// Whether the run can skip this reading and continue
    pub fn is_recoverable(&self) -> bool {
        match self {
            SourceError::Malformed { .. } => true,
            SourceError::Csv(e) => !matches!(e.kind(), csv::ErrorKind::Io(_)),
            _ => false,
        }
    }

    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        SourceError::Malformed { line, reason: reason.into() }
    }
}

/// Any ordered stream of readings
pub trait FeatureSource: Iterator<Item = Result<Reading, SourceError>> {}

impl<T> FeatureSource for T where T: Iterator<Item = Result<Reading, SourceError>> {}
