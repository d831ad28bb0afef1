//! Smart parking edge node
//!
//! Replays per-slot sensor features, predicts whether each slot is about to
//! change, and transmits only readings that carry news: a real occupancy
//! change or a predicted one. Everything else is counted and suppressed.

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::engine::{CountersSnapshot, DecisionEngine, Reason, RunningCounters, TransmissionEvent, Verdict};
pub use logic::run_loop::{Pipeline, PipelineError, RunOptions, RunReport};
