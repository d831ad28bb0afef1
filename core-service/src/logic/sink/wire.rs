//! Wire format shared with the collector
//!
//! Topics: `{prefix}/{slot}/event`, `{prefix}/{slot}/state`,
//! `{prefix}/metrics/transmissions`. Payloads are short text lines so a
//! plain pub/sub client can read them.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TOPIC_PREFIX;
use crate::logic::engine::{CountersSnapshot, Reason, TransmissionEvent};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub topic: String,
    pub payload: String,
}

impl WireMessage {
    fn new(topic: String, payload: String) -> Self {
        Self { topic, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn event(&self, slot_id: &str) -> String {
        format!("{}/{}/event", self.prefix, slot_id)
    }

    pub fn state(&self, slot_id: &str) -> String {
        format!("{}/{}/state", self.prefix, slot_id)
    }

    pub fn metrics(&self) -> String {
        format!("{}/metrics/transmissions", self.prefix)
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}

fn state_flag(occupied: bool) -> u8 {
    u8::from(occupied)
}

/// Messages for one event; suppressed events produce none
pub fn encode_event(topics: &Topics, event: &TransmissionEvent) -> Vec<WireMessage> {
    let ts = event.timestamp.format(TIMESTAMP_FORMAT);

    match event.reason {
        Reason::ActualChange => vec![
            WireMessage::new(
                topics.event(&event.slot_id),
                format!("CHANGE: state={}, ts={}", state_flag(event.occupied), ts),
            ),
            WireMessage::new(
                topics.state(&event.slot_id),
                state_flag(event.occupied).to_string(),
            ),
        ],
        Reason::PredChange => vec![WireMessage::new(
            topics.event(&event.slot_id),
            format!("PRED_CHANGE: prob={:.3}, ts={}", event.probability, ts),
        )],
        Reason::Suppressed => Vec::new(),
    }
}

pub fn encode_metrics(topics: &Topics, snapshot: &CountersSnapshot) -> WireMessage {
    WireMessage::new(topics.metrics(), snapshot.to_string())
}
