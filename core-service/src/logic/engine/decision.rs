//! Suppression Decision Engine
//!
//! Ordered rules, first match wins:
//! 1. ground truth changed (or first sighting of the slot) → transmit
//! 2. classifier predicts a change → transmit
//! 3. otherwise → suppress
//!
//! Rule 1 never consults the prediction, so a real transition can't be
//! suppressed by a confident but wrong model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::model::PredictionResult;
use crate::logic::source::{Reading, SlotId};
use super::counters::RunningCounters;
use super::tracker::OccupancyTracker;

// ============================================================================
// DECISION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Transmit,
    Suppress,
}

impl Verdict {
    pub fn is_transmit(&self) -> bool {
        matches!(self, Verdict::Transmit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    ActualChange,
    PredChange,
    Suppressed,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::ActualChange => "ACTUAL_CHANGE",
            Reason::PredChange => "PRED_CHANGE",
            Reason::Suppressed => "SUPPRESSED",
        }
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            Reason::ActualChange | Reason::PredChange => Verdict::Transmit,
            Reason::Suppressed => Verdict::Suppress,
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decision, emitted for every reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionEvent {
    /// Position of the reading within the run, starting at 1
    pub sequence: u64,
    pub slot_id: SlotId,
    pub timestamp: DateTime<Utc>,
    pub occupied: bool,
    pub probability: f32,
    pub reason: Reason,
    pub verdict: Verdict,
}

impl TransmissionEvent {
    pub fn is_transmit(&self) -> bool {
        self.verdict.is_transmit()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Default)]
pub struct DecisionEngine {
    tracker: OccupancyTracker,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide one reading and account for it in `counters`
    pub fn decide(
        &mut self,
        reading: &Reading,
        prediction: &PredictionResult,
        counters: &mut RunningCounters,
    ) -> TransmissionEvent {
        let first_sighting = !self.tracker.is_tracked(&reading.slot_id);
        let changed = self.tracker.update(&reading.slot_id, reading.occupied);

        let reason = if changed || first_sighting {
            Reason::ActualChange
        } else if prediction.predicted_change {
            Reason::PredChange
        } else {
            Reason::Suppressed
        };

        self.tracker.record_prediction(&reading.slot_id, prediction.probability);

        let verdict = reason.verdict();
        counters.record(verdict);

        TransmissionEvent {
            sequence: counters.total(),
            slot_id: reading.slot_id.clone(),
            timestamp: reading.timestamp,
            occupied: reading.occupied,
            probability: prediction.probability,
            reason,
            verdict,
        }
    }

    pub fn tracker(&self) -> &OccupancyTracker {
        &self.tracker
    }

    /// Forget all slots; used at run start
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}
