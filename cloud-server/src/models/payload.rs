//! Payload parsing
//!
//! Understood messages:
//! - `{prefix}/slot{n}/event`: `PRED_CHANGE: prob=0.998, ts=...`
//! - `{prefix}/slot{n}/event`: `CHANGE: state=0, ts=...`
//! - `{prefix}/slot{n}/state`: `0` or `1`
//! - `{prefix}/metrics/transmissions`: `Traditional=1000, EdgeAI=483, Reduction=51.70%`
//!
//! Anything else is kept as a raw message for the slot named in the topic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Slot used when the topic names none
pub const DEFAULT_SLOT: &str = "slot1";

static SLOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"slot(\d+)").unwrap());
static PAIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)=([\d.]+)").unwrap());
static PROB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"prob=([\d.]+)").unwrap());
static STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"state\s*=\s*(\d+)").unwrap());

/// Occupancy as reported: numeric code, or text a client sent instead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Code(i64),
    Text(String),
}

impl StateValue {
    pub fn parse(text: &str) -> Self {
        text.parse().map(StateValue::Code).unwrap_or_else(|_| StateValue::Text(text.to_string()))
    }

    /// Grid label
    pub fn label(&self) -> String {
        match self {
            StateValue::Code(0) => "EMPTY".to_string(),
            StateValue::Code(1) => "OCCUPIED".to_string(),
            StateValue::Code(n) => n.to_string(),
            StateValue::Text(t) => t.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsUpdate {
    pub traditional: Option<u64>,
    pub edge_ai: Option<u64>,
    pub reduction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParsedMessage {
    Metrics(MetricsUpdate),
    PredChange { probability: Option<f32> },
    /// `state` is `None` when the payload had no readable state
    Change { state: Option<i64> },
    State { value: StateValue },
    Msg { text: String },
}

impl ParsedMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedMessage::Metrics(_) => "METRICS",
            ParsedMessage::PredChange { .. } => "PRED_CHANGE",
            ParsedMessage::Change { .. } => "CHANGE",
            ParsedMessage::State { .. } => "STATE",
            ParsedMessage::Msg { .. } => "MSG",
        }
    }

    /// Short description for event timelines
    pub fn info(&self) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "none".to_string(), T::to_string)
        }

        match self {
            ParsedMessage::Metrics(m) => format!(
                "Traditional={}, EdgeAI={}, Reduction={}",
                opt(&m.traditional),
                opt(&m.edge_ai),
                opt(&m.reduction)
            ),
            ParsedMessage::PredChange { probability } => format!("prob={}", opt(probability)),
            ParsedMessage::Change { state } => format!("state={}", opt(state)),
            ParsedMessage::State { value } => match value {
                StateValue::Code(n) => n.to_string(),
                StateValue::Text(t) => t.clone(),
            },
            ParsedMessage::Msg { text } => text.clone(),
        }
    }
}

/// Slot named in the topic, e.g. `smartparking/slot12/event` → `slot12`
pub fn slot_from_topic(topic: &str) -> String {
    SLOT_RE
        .captures(topic)
        .and_then(|c| c.get(1))
        .map(|m| format!("slot{}", m.as_str()))
        .unwrap_or_else(|| DEFAULT_SLOT.to_string())
}

pub fn is_metrics_topic(topic: &str) -> bool {
    topic.ends_with("metrics/transmissions")
}

/// Classify one message; order matters, first match wins
pub fn parse_payload(topic: &str, payload: &str) -> ParsedMessage {
    let text = payload.trim();

    if is_metrics_topic(topic) {
        let mut update = MetricsUpdate::default();
        for caps in PAIR_RE.captures_iter(text) {
            let value = &caps[2];
            match &caps[1] {
                "Traditional" => update.traditional = value.parse::<f64>().ok().map(|v| v as u64),
                "EdgeAI" => update.edge_ai = value.parse::<f64>().ok().map(|v| v as u64),
                "Reduction" => update.reduction = value.parse().ok(),
                _ => {}
            }
        }
        return ParsedMessage::Metrics(update);
    }

    if text.contains("PRED_CHANGE") {
        let probability = PROB_RE
            .captures(text)
            .and_then(|c| c[1].parse().ok());
        return ParsedMessage::PredChange { probability };
    }

    if text.starts_with("CHANGE") {
        let state = STATE_RE
            .captures(text)
            .and_then(|c| c[1].parse().ok());
        return ParsedMessage::Change { state };
    }

    if topic.ends_with("/state") {
        return ParsedMessage::State { value: StateValue::parse(text) };
    }

    ParsedMessage::Msg { text: text.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        for re in [&SLOT_RE, &PAIR_RE, &PROB_RE, &STATE_RE] {
            assert!(!Lazy::force(re).as_str().is_empty());
        }
    }

    #[test]
    fn test_slot_from_topic() {
        assert_eq!(slot_from_topic("smartparking/slot12/event"), "slot12");
        assert_eq!(slot_from_topic("smartparking/metrics/transmissions"), "slot1");
        assert_eq!(slot_from_topic("lot/bay/state"), "slot1");
    }

    #[test]
    fn test_parse_metrics() {
        let parsed = parse_payload(
            "smartparking/metrics/transmissions",
            "Traditional=1000, EdgeAI=483, Reduction=51.70%",
        );
        assert_eq!(
            parsed,
            ParsedMessage::Metrics(MetricsUpdate {
                traditional: Some(1000),
                edge_ai: Some(483),
                reduction: Some(51.7),
            })
        );
    }

    #[test]
    fn test_parse_pred_change() {
        let parsed = parse_payload("smartparking/slot1/event", "PRED_CHANGE: prob=0.998, ts=2024-05-01 12:00:00.000");
        assert_eq!(parsed, ParsedMessage::PredChange { probability: Some(0.998) });
        assert_eq!(parsed.info(), "prob=0.998");
    }

    #[test]
    fn test_parse_change() {
        let parsed = parse_payload("smartparking/slot3/event", "CHANGE: state=1, ts=2024-05-01 12:00:00.000");
        assert_eq!(parsed, ParsedMessage::Change { state: Some(1) });

        let parsed = parse_payload("smartparking/slot3/event", "CHANGE: ts=2024-05-01");
        assert_eq!(parsed, ParsedMessage::Change { state: None });
        assert_eq!(parsed.info(), "state=none");
    }

    #[test]
    fn test_parse_raw_state() {
        assert_eq!(
            parse_payload("smartparking/slot2/state", " 0 "),
            ParsedMessage::State { value: StateValue::Code(0) }
        );
        assert_eq!(
            parse_payload("smartparking/slot2/state", "unknown"),
            ParsedMessage::State { value: StateValue::Text("unknown".into()) }
        );
    }

    #[test]
    fn test_fallback_is_raw_message() {
        let parsed = parse_payload("smartparking/slot2/debug", "hello");
        assert_eq!(parsed.kind(), "MSG");
        assert_eq!(parsed.info(), "hello");
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(StateValue::Code(0).label(), "EMPTY");
        assert_eq!(StateValue::Code(1).label(), "OCCUPIED");
        assert_eq!(StateValue::Text("maintenance".into()).label(), "maintenance");
    }
}
