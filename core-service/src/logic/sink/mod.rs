//! Transmission Sinks - where TRANSMIT decisions go
//!
//! - `wire.rs` - topics and text payloads understood by the collector
//! - `log_sink.rs` - logs each transmission
//! - `recorder.rs` - append-only JSONL with rotation
//! - `http.rs` - blocking POST to the collector
//!
//! Publishing is fire-and-forget: the decision is already counted when a
//! sink fails, the error only tells the caller delivery did not happen.

pub mod http;
pub mod log_sink;
pub mod recorder;
pub mod wire;

use crate::logic::engine::{CountersSnapshot, TransmissionEvent};

pub use http::HttpSink;
pub use log_sink::LogSink;
pub use recorder::JsonlRecorder;
pub use wire::{Topics, WireMessage};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Collector rejected message: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Collector unreachable: {0}")]
    Unavailable(String),
}

pub trait TransmissionSink: Send {
    fn name(&self) -> &str;

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError>;

    fn publish_metrics(&mut self, _snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: TransmissionSink + ?Sized> TransmissionSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError> {
        (**self).publish(event)
    }

    fn publish_metrics(&mut self, snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        (**self).publish_metrics(snapshot)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

// ============================================================================
// FANOUT
// ============================================================================

/// Publishes to every inner sink; one failing sink doesn't starve the rest
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn TransmissionSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl TransmissionSink + 'static) -> Self {
        self.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn TransmissionSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn each<F>(&mut self, mut f: F) -> Result<(), SinkError>
    where
        F: FnMut(&mut dyn TransmissionSink) -> Result<(), SinkError>,
    {
        let mut first_error = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = f(sink.as_mut()) {
                log::warn!("Sink '{}' failed: {}", sink.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl TransmissionSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError> {
        self.each(|s| s.publish(event))
    }

    fn publish_metrics(&mut self, snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        self.each(|s| s.publish_metrics(snapshot))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.each(|s| s.flush())
    }
}

// ============================================================================
// MEMORY
// ============================================================================

/// Keeps everything it receives; for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<TransmissionEvent>,
    pub metrics: Vec<CountersSnapshot>,
    /// Reject the next N publishes
    pub fail_next: usize,
    /// Reject metrics summaries
    pub fail_metrics: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransmissionSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(SinkError::Unavailable("memory sink set to fail".to_string()));
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn publish_metrics(&mut self, snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        if self.fail_metrics {
            return Err(SinkError::Unavailable("memory sink rejects metrics".to_string()));
        }
        self.metrics.push(*snapshot);
        Ok(())
    }
}
