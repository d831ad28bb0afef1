//! Per-slot timelines and views

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::payload::StateValue;

/// Bounded, most-recent-first history
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Timeline<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_back();
        }
        self.items.push_front(item);
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> Timeline<T> {
    /// First `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<T> {
        self.items.iter().take(limit).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotEvent {
    pub received_at: DateTime<Utc>,
    pub kind: String,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityPoint {
    pub received_at: DateTime<Utc>,
    pub probability: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyPoint {
    pub received_at: DateTime<Utc>,
    pub state: Option<StateValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub received_at: DateTime<Utc>,
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone)]
pub struct SlotHistory {
    pub events: Timeline<SlotEvent>,
    pub predictions: Timeline<ProbabilityPoint>,
    pub occupancy: Timeline<OccupancyPoint>,
}

impl SlotHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Timeline::new(capacity),
            predictions: Timeline::new(capacity),
            occupancy: Timeline::new(capacity),
        }
    }
}

// ============================================================================
// VIEWS
// ============================================================================

/// One cell of the live slot grid
#[derive(Debug, Clone, Serialize)]
pub struct SlotSummary {
    pub slot_id: String,
    /// EMPTY, OCCUPIED, NO_DATA or the raw state text
    pub status: String,
    pub state: Option<StateValue>,
    pub updated_at: Option<DateTime<Utc>>,
    pub events: usize,
    pub predictions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotDetail {
    pub slot_id: String,
    pub events: Vec<SlotEvent>,
    pub predictions: Vec<ProbabilityPoint>,
    pub occupancy: Vec<OccupancyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentEvent {
    pub slot_id: String,
    #[serde(flatten)]
    pub event: SlotEvent,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsView {
    pub traditional: Option<u64>,
    pub edge_ai: Option<u64>,
    pub reduction: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub messages_ingested: u64,
}
