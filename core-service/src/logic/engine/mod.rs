//! Engine Module - per-reading transmit/suppress decisions
//!
//! - `tracker.rs` - ground-truth occupancy per slot
//! - `decision.rs` - the three-rule policy and `TransmissionEvent`
//! - `counters.rs` - running totals and reduction percentage

pub mod counters;
pub mod decision;
pub mod tracker;


pub use counters::{CountersSnapshot, RunningCounters};
pub use decision::{DecisionEngine, Reason, TransmissionEvent, Verdict};
pub use tracker::{OccupancyTracker, SlotState};
