//! Central Configuration Constants
//!
//! Single source of truth for run defaults.
//! `RunConfig` starts from these, then env, then CLI flags.

/// Distance below which the reference ToF group reports a parked car (mm)
pub const DEFAULT_CHANGE_THRESHOLD_MM: f32 = 300.0;

/// Probability at or above which the classifier flags an upcoming change
pub const DEFAULT_DECISION_THRESHOLD: f32 = 0.5;

/// Pause between readings during replay (ms), 0 disables pacing
pub const DEFAULT_SEND_INTERVAL_MS: u64 = 50;

/// Log running counters every N readings
pub const DEFAULT_REPORT_INTERVAL: u64 = 100;

/// Slot used when the dataset has no slot column
pub const DEFAULT_SLOT_ID: &str = "slot1";

/// Topic prefix for published messages
pub const DEFAULT_TOPIC_PREFIX: &str = "smartparking";

/// Collector used by the HTTP sink
///
/// For development: http://localhost:8080
pub const DEFAULT_COLLECTOR_URL: &str = "http://localhost:8080";

/// HTTP sink request timeout (ms)
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2_000;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "smartpark-core";

// ============================================
// Environment overrides (SMARTPARK_*)
// ============================================

pub const ENV_FEATURES: &str = "SMARTPARK_FEATURES";
pub const ENV_MANIFEST: &str = "SMARTPARK_MANIFEST";
pub const ENV_SLOT_ID: &str = "SMARTPARK_SLOT_ID";
pub const ENV_CHANGE_THRESHOLD_MM: &str = "SMARTPARK_CHANGE_THRESHOLD_MM";
pub const ENV_DECISION_THRESHOLD: &str = "SMARTPARK_DECISION_THRESHOLD";
pub const ENV_SEND_INTERVAL_MS: &str = "SMARTPARK_SEND_INTERVAL_MS";
pub const ENV_REPORT_INTERVAL: &str = "SMARTPARK_REPORT_INTERVAL";
pub const ENV_TOPIC_PREFIX: &str = "SMARTPARK_TOPIC_PREFIX";
pub const ENV_COLLECTOR_URL: &str = "SMARTPARK_COLLECTOR_URL";
pub const ENV_JSONL_DIR: &str = "SMARTPARK_JSONL_DIR";
pub const ENV_FAIL_ON_PUBLISH_ERROR: &str = "SMARTPARK_FAIL_ON_PUBLISH_ERROR";

/// Raw string from the environment, empty counts as unset
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Parsed value from the environment; unparsable values are ignored with a warning
pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

/// Boolean flag from the environment ("true"/"1" vs "false"/"0")
pub fn env_flag(key: &str) -> Option<bool> {
    env_string(key).map(|s| s.eq_ignore_ascii_case("true") || s.trim() == "1")
}
