//! HTTP sink - blocking POST of wire messages to the collector
//!
//! `POST {base}/api/v1/messages` with `{"messages": [{topic, payload}, ...]}`.
//! A collector that is down fails the publish; nothing is queued or retried.

use std::time::Duration;

use serde::Serialize;

use super::wire::{self, Topics, WireMessage};
use super::{SinkError, TransmissionSink};
use crate::logic::engine::{CountersSnapshot, TransmissionEvent};

const MESSAGES_PATH: &str = "/api/v1/messages";

#[derive(Debug, Serialize)]
struct MessageBatch<'a> {
    messages: &'a [WireMessage],
}

pub struct HttpSink {
    agent: ureq::Agent,
    endpoint: String,
    topics: Topics,
    sent: u64,
}

impl HttpSink {
    pub fn new(base_url: &str, topics: Topics, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("smartpark-core/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            endpoint: messages_endpoint(base_url),
            topics,
            sent: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Messages accepted by the collector so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn post(&mut self, messages: &[WireMessage]) -> Result<(), SinkError> {
        if messages.is_empty() {
            return Ok(());
        }

        match self.agent.post(&self.endpoint).send_json(MessageBatch { messages }) {
            Ok(_) => {
                self.sent += messages.len() as u64;
                Ok(())
            }
            Err(ureq::Error::Status(status, _)) => Err(SinkError::Rejected { status }),
            Err(ureq::Error::Transport(t)) => Err(SinkError::Unavailable(t.to_string())),
        }
    }
}

fn messages_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), MESSAGES_PATH)
}

impl TransmissionSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError> {
        let messages = wire::encode_event(&self.topics, event);
        self.post(&messages)
    }

    fn publish_metrics(&mut self, snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        let message = wire::encode_metrics(&self.topics, snapshot);
        self.post(std::slice::from_ref(&message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::logic::engine::Reason;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(messages_endpoint("http://localhost:8080/"), "http://localhost:8080/api/v1/messages");
        assert_eq!(messages_endpoint("http://collector"), "http://collector/api/v1/messages");
    }

    #[test]
    fn test_batch_body_shape() {
        let messages = vec![WireMessage {
            topic: "smartparking/slot1/state".into(),
            payload: "1".into(),
        }];
        let body = serde_json::to_value(MessageBatch { messages: &messages }).unwrap();
        assert_eq!(body["messages"][0]["topic"], "smartparking/slot1/state");
        assert_eq!(body["messages"][0]["payload"], "1");
    }

    #[test]
    fn test_unreachable_collector_fails_publish() {
        // port 9 (discard) on localhost is not expected to run an HTTP server
        let mut sink = HttpSink::new("http://127.0.0.1:9", Topics::default(), Duration::from_millis(200));
        let event = TransmissionEvent {
            sequence: 1,
            slot_id: "slot1".into(),
            timestamp: Utc::now(),
            occupied: true,
            probability: 0.1,
            reason: Reason::ActualChange,
            verdict: Reason::ActualChange.verdict(),
        };

        let result = sink.publish(&event);
        assert!(matches!(result, Err(SinkError::Unavailable(_)) | Err(SinkError::Rejected { .. })));
        assert_eq!(sink.sent(), 0);
    }

    #[test]
    fn test_suppressed_event_sends_nothing() {
        let mut sink = HttpSink::new("http://127.0.0.1:9", Topics::default(), Duration::from_millis(50));
        let event = TransmissionEvent {
            sequence: 2,
            slot_id: "slot1".into(),
            timestamp: Utc::now(),
            occupied: true,
            probability: 0.1,
            reason: Reason::Suppressed,
            verdict: Reason::Suppressed.verdict(),
        };
        assert!(sink.publish(&event).is_ok());
    }
}
