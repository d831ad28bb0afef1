//! Log sink - one line per transmitted message

use super::wire::{self, Topics};
use super::{SinkError, TransmissionSink};
use crate::logic::engine::{CountersSnapshot, TransmissionEvent};

pub struct LogSink {
    topics: Topics,
}

impl LogSink {
    pub fn new(topics: Topics) -> Self {
        Self { topics }
    }
}

impl TransmissionSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError> {
        for message in wire::encode_event(&self.topics, event) {
            log::info!("[TX] {} → {}", message.topic, message.payload);
        }
        Ok(())
    }

    fn publish_metrics(&mut self, snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        let message = wire::encode_metrics(&self.topics, snapshot);
        log::info!("[METRICS] {} → {}", message.topic, message.payload);
        Ok(())
    }
}
