//! Logic Module - edge suppression engine
//!
//! - `features/` - feature layout and vectors
//! - `source/` - ordered readings from the features dataset
//! - `model/` - scaler + classifier behind a model manifest
//! - `engine/` - occupancy tracking, transmit/suppress decisions, counters
//! - `sink/` - where transmitted events go (log, JSONL, collector)
//! - `run_loop.rs` - ties the above together for one replay
//! - `config.rs` - layered run configuration

pub mod config;
pub mod engine;
pub mod features;
pub mod model;
pub mod run_loop;
pub mod sink;
pub mod source;
