//! Run Loop - source → predictor → engine → sink
//!
//! Single-threaded: each reading is predicted, decided, counted and (if
//! transmitted) published before the next one is pulled. Malformed rows
//! are skipped and counted; every other source error ends the run.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::logic::config::RunConfig;
use crate::logic::engine::{CountersSnapshot, DecisionEngine, RunningCounters, TransmissionEvent};
use crate::logic::model::{InferenceError, PredictorStatus, StabilityPredictor};
use crate::logic::sink::{SinkError, TransmissionSink};
use crate::logic::source::{FeatureSource, Reading, SlotId, SourceError};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Inference failed for {slot_id} at {timestamp}: {source}")]
    Inference {
        slot_id: SlotId,
        timestamp: chrono::DateTime<chrono::Utc>,
        #[source]
        source: InferenceError,
    },

    /// Decision and counters are already recorded; only delivery failed
    #[error("Publish failed for event #{}: {source}", .event.sequence)]
    Publish {
        event: Box<TransmissionEvent>,
        #[source]
        source: SinkError,
    },

    #[error("Publishing metrics failed: {0}")]
    Metrics(#[source] SinkError),
}

// ============================================================================
// OPTIONS & REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Pause after each reading; zero replays as fast as possible
    pub send_interval: Duration,
    /// Log counters every N readings, 0 disables
    pub report_interval: u64,
    pub fail_on_publish_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            send_interval: Duration::ZERO,
            report_interval: 0,
            fail_on_publish_error: false,
        }
    }
}

impl From<&RunConfig> for RunOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            send_interval: Duration::from_millis(config.send_interval_ms),
            report_interval: config.report_interval,
            fail_on_publish_error: config.fail_on_publish_error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub counters: CountersSnapshot,
    /// Malformed readings dropped before the engine (not in `counters.total`)
    pub skipped: u64,
    /// TRANSMIT events the sink did not accept
    pub publish_failures: u64,
    /// End-of-run metrics summary the sink did not accept
    pub metrics_failures: u64,
    /// Slots seen during the run, sorted
    pub slots: Vec<SlotId>,
    pub elapsed_ms: u64,
    pub predictor: PredictorStatus,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<S: TransmissionSink> {
    predictor: StabilityPredictor,
    engine: DecisionEngine,
    counters: RunningCounters,
    sink: S,
    options: RunOptions,
}

impl<S: TransmissionSink> Pipeline<S> {
    pub fn new(predictor: StabilityPredictor, sink: S, options: RunOptions) -> Self {
        Self {
            predictor,
            engine: DecisionEngine::new(),
            counters: RunningCounters::new(),
            sink,
            options,
        }
    }

    /// Handle one reading end to end
    ///
    /// Suppressed readings are counted but never reach the sink.
    pub fn process(&mut self, reading: &Reading) -> Result<TransmissionEvent, PipelineError> {
        let prediction = self
            .predictor
            .predict(&reading.features)
            .map_err(|source| PipelineError::Inference {
                slot_id: reading.slot_id.clone(),
                timestamp: reading.timestamp,
                source,
            })?;

        let event = self.engine.decide(reading, &prediction, &mut self.counters);
        log::debug!(
            "#{} {} occupied={} p={:.3} → {}",
            event.sequence,
            event.slot_id,
            event.occupied,
            event.probability,
            event.reason
        );

        if event.is_transmit() {
            if let Err(source) = self.sink.publish(&event) {
                return Err(PipelineError::Publish {
                    event: Box::new(event),
                    source,
                });
            }
        }

        Ok(event)
    }

    /// Replay a whole source with fresh state
    pub fn run<I: FeatureSource>(&mut self, source: I) -> Result<RunReport, PipelineError> {
        self.reset();

        let start = Instant::now();
        let mut skipped = 0u64;
        let mut publish_failures = 0u64;

        log::info!(
            "Run started: model={} threshold={:.2}",
            self.predictor.info().name,
            self.predictor.threshold().decision_threshold
        );

        for item in source {
            let reading = match item {
                Ok(reading) => reading,
                Err(e) if e.is_recoverable() => {
                    log::warn!("Skipping reading: {}", e);
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    log::error!("Feature source failed: {}", e);
                    return Err(e.into());
                }
            };

            match self.process(&reading) {
                Ok(_) => {}
                Err(PipelineError::Publish { event, source }) => {
                    publish_failures += 1;
                    log::warn!("Publish failed for event #{} ({}): {}", event.sequence, event.slot_id, source);
                    if self.options.fail_on_publish_error {
                        return Err(PipelineError::Publish { event, source });
                    }
                }
                Err(e) => return Err(e),
            }

            let total = self.counters.total();
            if self.options.report_interval > 0 && total % self.options.report_interval == 0 {
                log::info!("[{}] {}", total, self.counters.snapshot());
            }

            if !self.options.send_interval.is_zero() {
                thread::sleep(self.options.send_interval);
            }
        }

        let snapshot = self.counters.snapshot();
        let mut metrics_failures = 0u64;
        if let Err(e) = self.sink.publish_metrics(&snapshot) {
            metrics_failures += 1;
            log::warn!("Publishing metrics failed: {}", e);
            if self.options.fail_on_publish_error {
                return Err(PipelineError::Metrics(e));
            }
        }
        if let Err(e) = self.sink.flush() {
            log::warn!("Sink flush failed: {}", e);
        }

        let report = RunReport {
            counters: snapshot,
            skipped,
            publish_failures,
            metrics_failures,
            slots: self.engine.tracker().slot_ids().into_iter().map(String::from).collect(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            predictor: self.predictor.status(),
        };

        log::info!(
            "Run finished: {} ({} skipped, {} publish failures, {} slots)",
            report.counters,
            report.skipped,
            report.publish_failures,
            report.slots.len()
        );
        Ok(report)
    }

    /// Forget slot state and counters
    pub fn reset(&mut self) {
        self.engine.reset();
        self.counters = RunningCounters::new();
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn predictor(&self) -> &StabilityPredictor {
        &self.predictor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
