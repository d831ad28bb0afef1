//! Occupancy State Tracker
//!
//! Owns every `SlotState`. Entries are created on a slot's first reading and
//! live until the tracker is reset at the start of a run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::logic::source::SlotId;

/// Per-slot record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    /// Last ground-truth occupancy seen (and announced)
    pub occupied: bool,
    /// Last prediction probability; diagnostic only
    pub last_probability: Option<f32>,
    pub readings: u64,
}

#[derive(Debug, Default)]
pub struct OccupancyTracker {
    slots: HashMap<SlotId, SlotState>,
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation; true only when a known slot changed state
    pub fn update(&mut self, slot_id: &str, occupied: bool) -> bool {
        match self.slots.get_mut(slot_id) {
            Some(state) => {
                state.readings += 1;
                if state.occupied != occupied {
                    state.occupied = occupied;
                    true
                } else {
                    false
                }
            }
            None => {
                self.slots.insert(
                    slot_id.to_string(),
                    SlotState {
                        occupied,
                        last_probability: None,
                        readings: 1,
                    },
                );
                false
            }
        }
    }

    pub(crate) fn record_prediction(&mut self, slot_id: &str, probability: f32) {
        if let Some(state) = self.slots.get_mut(slot_id) {
            state.last_probability = Some(probability);
        }
    }

    pub fn is_tracked(&self, slot_id: &str) -> bool {
        self.slots.contains_key(slot_id)
    }

    pub fn get(&self, slot_id: &str) -> Option<&SlotState> {
        self.slots.get(slot_id)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot ids in sorted order
    pub fn slot_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }
}
