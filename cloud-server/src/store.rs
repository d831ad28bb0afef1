//! In-memory collector store
//!
//! Holds per-slot timelines, the global raw log and the latest metrics.
//! Shared behind `tokio::sync::RwLock`: ingest takes the write lock, every
//! query only reads. The number of distinct slots is capped; histories are
//! never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::{
    is_metrics_topic, parse_payload, slot_from_topic, LogEntry, MetricsView, OccupancyPoint, ParsedMessage,
    ProbabilityPoint, RecentEvent, SlotDetail, SlotEvent, SlotHistory, SlotSummary, StateValue,
    Timeline,
};

pub type SharedStore = Arc<RwLock<CollectorStore>>;

#[derive(Debug)]
pub struct CollectorStore {
    capacity: usize,
    max_slots: usize,
    slots: HashMap<String, SlotHistory>,
    raw_log: Timeline<LogEntry>,
    metrics: MetricsView,
}

/// What one ingested message turned into
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// `None` for global messages (metrics)
    pub slot_id: Option<String>,
    pub kind: &'static str,
}

impl CollectorStore {
    pub fn new(capacity: usize, max_slots: usize) -> Self {
        Self {
            capacity,
            max_slots,
            slots: HashMap::new(),
            raw_log: Timeline::new(capacity),
            metrics: MetricsView::default(),
        }
    }

    pub fn shared(capacity: usize, max_slots: usize) -> SharedStore {
        Arc::new(RwLock::new(Self::new(capacity, max_slots)))
    }

    /// Reject a set of topics that would open more slots than allowed
    pub fn check_capacity<'a, I>(&self, topics: I) -> AppResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut new_slots: Vec<String> = Vec::new();
        for topic in topics {
            if is_metrics_topic(topic) {
                continue;
            }
            let slot_id = slot_from_topic(topic);
            if !self.slots.contains_key(&slot_id) && !new_slots.contains(&slot_id) {
                new_slots.push(slot_id);
            }
        }

        if self.slots.len() + new_slots.len() > self.max_slots {
            return Err(AppError::ValidationError(format!(
                "slot limit reached ({} tracked, max {}); rejected new slots: {}",
                self.slots.len(),
                self.max_slots,
                new_slots.join(", ")
            )));
        }
        Ok(())
    }

    fn slot_mut(&mut self, slot_id: &str) -> &mut SlotHistory {
        let capacity = self.capacity;
        self.slots
            .entry(slot_id.to_string())
            .or_insert_with(|| SlotHistory::new(capacity))
    }

    pub fn ingest(&mut self, topic: &str, payload: &str, now: DateTime<Utc>) -> AppResult<IngestOutcome> {
        self.check_capacity([topic])?;

        let parsed = parse_payload(topic, payload);
        let kind = parsed.kind();
        let info = parsed.info();

        self.metrics.messages_ingested += 1;
        self.raw_log.push(LogEntry {
            received_at: now,
            topic: topic.to_string(),
            payload: payload.trim().to_string(),
        });

        if let ParsedMessage::Metrics(update) = &parsed {
            if update.traditional.is_some() {
                self.metrics.traditional = update.traditional;
            }
            if update.edge_ai.is_some() {
                self.metrics.edge_ai = update.edge_ai;
            }
            if update.reduction.is_some() {
                self.metrics.reduction = update.reduction;
            }
            self.metrics.updated_at = Some(now);
            return Ok(IngestOutcome { slot_id: None, kind });
        }

        let slot_id = slot_from_topic(topic);
        let slot = self.slot_mut(&slot_id);

        match parsed {
            ParsedMessage::PredChange { probability } => {
                slot.predictions.push(ProbabilityPoint { received_at: now, probability });
            }
            ParsedMessage::Change { state } => {
                slot.occupancy.push(OccupancyPoint {
                    received_at: now,
                    state: state.map(StateValue::Code),
                });
            }
            ParsedMessage::State { value } => {
                slot.occupancy.push(OccupancyPoint { received_at: now, state: Some(value) });
            }
            ParsedMessage::Msg { .. } | ParsedMessage::Metrics(_) => {}
        }

        slot.events.push(SlotEvent {
            received_at: now,
            kind: kind.to_string(),
            info,
        });

        Ok(IngestOutcome { slot_id: Some(slot_id), kind })
    }

    /// Live grid, ordered by slot number
    pub fn slots(&self) -> Vec<SlotSummary> {
        let mut summaries: Vec<SlotSummary> = self
            .slots
            .iter()
            .map(|(slot_id, history)| {
                let latest = history.occupancy.latest();
                let state = latest.and_then(|p| p.state.clone());
                SlotSummary {
                    slot_id: slot_id.clone(),
                    status: state.as_ref().map_or_else(|| "NO_DATA".to_string(), StateValue::label),
                    state,
                    updated_at: latest.map(|p| p.received_at),
                    events: history.events.len(),
                    predictions: history.predictions.len(),
                }
            })
            .collect();

        summaries.sort_by(|a, b| slot_order(&a.slot_id).cmp(&slot_order(&b.slot_id)));
        summaries
    }

    pub fn slot(&self, slot_id: &str, limit: usize) -> Option<SlotDetail> {
        self.slots.get(slot_id).map(|history| SlotDetail {
            slot_id: slot_id.to_string(),
            events: history.events.recent(limit),
            predictions: history.predictions.recent(limit),
            occupancy: history.occupancy.recent(limit),
        })
    }

    /// Newest events across slots, at most `per_slot` from each
    pub fn recent_events(&self, per_slot: usize, limit: usize) -> Vec<RecentEvent> {
        let mut events: Vec<RecentEvent> = self
            .slots
            .iter()
            .flat_map(|(slot_id, history)| {
                history.events.iter().take(per_slot).map(move |event| RecentEvent {
                    slot_id: slot_id.clone(),
                    event: event.clone(),
                })
            })
            .collect();

        events.sort_by(|a, b| b.event.received_at.cmp(&a.event.received_at));
        events.truncate(limit);
        events
    }

    pub fn metrics(&self) -> MetricsView {
        self.metrics.clone()
    }

    pub fn log(&self, limit: usize) -> Vec<LogEntry> {
        self.raw_log.recent(limit)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }
}

/// `slot2` before `slot10`; ids without a number sort last by name
fn slot_order(slot_id: &str) -> (u64, &str) {
    let number = slot_id
        .strip_prefix("slot")
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX);
    (number, slot_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_714_564_800, 0).unwrap_or_default() + Duration::seconds(secs)
    }

    #[test]
    fn test_ingest_routes_by_topic() {
        let mut store = CollectorStore::new(10, 100);

        let o = store.ingest("smartparking/slot2/event", "CHANGE: state=1, ts=x", at(0)).unwrap();
        assert_eq!(o, IngestOutcome { slot_id: Some("slot2".into()), kind: "CHANGE" });
        store.ingest("smartparking/slot2/state", "1", at(0)).unwrap();
        store.ingest("smartparking/slot2/event", "PRED_CHANGE: prob=0.91, ts=x", at(1)).unwrap();

        let detail = store.slot("slot2", 10).unwrap();
        assert_eq!(detail.events.len(), 3);
        assert_eq!(detail.events[0].kind, "PRED_CHANGE");
        assert_eq!(detail.occupancy.len(), 2);
        assert_eq!(detail.predictions[0].probability, Some(0.91));
        assert_eq!(store.log(10).len(), 3);
    }

    #[test]
    fn test_metrics_are_global() {
        let mut store = CollectorStore::new(10, 100);
        let o = store.ingest(
            "smartparking/metrics/transmissions",
            "Traditional=10, EdgeAI=4, Reduction=60.00%",
            at(0),
        ).unwrap();
        assert_eq!(o.slot_id, None);
        assert_eq!(store.slot_count(), 0);

        let metrics = store.metrics();
        assert_eq!(metrics.traditional, Some(10));
        assert_eq!(metrics.edge_ai, Some(4));
        assert_eq!(metrics.reduction, Some(60.0));
        assert_eq!(metrics.messages_ingested, 1);
    }

    #[test]
    fn test_grid_status_and_order() {
        let mut store = CollectorStore::new(10, 100);
        store.ingest("smartparking/slot10/state", "0", at(0)).unwrap();
        store.ingest("smartparking/slot2/state", "1", at(1)).unwrap();
        store.ingest("smartparking/slot3/event", "PRED_CHANGE: prob=0.7", at(2)).unwrap();

        let grid = store.slots();
        let ids: Vec<&str> = grid.iter().map(|s| s.slot_id.as_str()).collect();
        assert_eq!(ids, vec!["slot2", "slot3", "slot10"]);
        assert_eq!(grid[0].status, "OCCUPIED");
        assert_eq!(grid[1].status, "NO_DATA");
        assert_eq!(grid[2].status, "EMPTY");
    }

    #[test]
    fn test_histories_are_bounded() {
        let mut store = CollectorStore::new(5, 100);
        for i in 0..20 {
            store.ingest("smartparking/slot1/state", &(i % 2).to_string(), at(i)).unwrap();
        }
        let detail = store.slot("slot1", 100).unwrap();
        assert_eq!(detail.occupancy.len(), 5);
        assert_eq!(detail.occupancy[0].received_at, at(19));
        assert_eq!(store.log(100).len(), 5);
    }

    #[test]
    fn test_slot_cap() {
        let mut store = CollectorStore::new(10, 2);
        store.ingest("smartparking/slot1/state", "1", at(0)).unwrap();
        store.ingest("smartparking/slot2/state", "0", at(0)).unwrap();

        let err = store.ingest("smartparking/slot3/state", "1", at(1)).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(store.slot_count(), 2);
        assert_eq!(store.log(10).len(), 2);

        // known slots and global metrics still go through
        store.ingest("smartparking/slot2/state", "1", at(2)).unwrap();
        store
            .ingest("smartparking/metrics/transmissions", "Traditional=3, EdgeAI=3, Reduction=0.00%", at(2))
            .unwrap();
        assert_eq!(store.metrics().messages_ingested, 4);

        assert!(store.check_capacity(["smartparking/slot1/event", "smartparking/slot2/event"]).is_ok());
        assert!(store.check_capacity(["smartparking/slot9/event"]).is_err());
    }

    #[test]
    fn test_recent_events_across_slots() {
        let mut store = CollectorStore::new(50, 100);
        for i in 0..10 {
            store.ingest("smartparking/slot1/state", "1", at(i)).unwrap();
            store.ingest("smartparking/slot2/state", "0", at(i)).unwrap();
        }
        let recent = store.recent_events(3, 4);
        assert_eq!(recent.len(), 4);
        assert!(recent.windows(2).all(|w| w[0].event.received_at >= w[1].event.received_at));
    }
}
