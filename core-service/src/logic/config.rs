//! Run Configuration
//!
//! Layered: constants → optional JSON file → `SMARTPARK_*` env → CLI flags.
//! `validate` runs once before anything is opened.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{self, *};
use crate::logic::features;
use crate::logic::model::ThresholdConfig;
use crate::logic::sink::Topics;
use crate::logic::source::OccupancyRule;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field, reason: reason.into() }
    }
}

// ============================================================================
// SINKS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Log every transmitted event
    pub log: bool,
    /// Append events to JSONL files in this directory
    pub jsonl_dir: Option<PathBuf>,
    /// POST messages to this collector
    pub collector_url: Option<String>,
    pub http_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            log: true,
            jsonl_dir: None,
            collector_url: None,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// RUN CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub features_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub default_slot: String,
    pub occupancy_feature: String,
    pub change_threshold_mm: f32,
    /// Overrides the manifest threshold when set
    pub decision_threshold: Option<f32>,
    pub send_interval_ms: u64,
    pub report_interval: u64,
    /// Buffer and sort the dataset instead of streaming it
    pub sort_input: bool,
    pub topic_prefix: String,
    pub fail_on_publish_error: bool,
    pub sinks: SinkConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            features_path: None,
            manifest_path: None,
            default_slot: DEFAULT_SLOT_ID.to_string(),
            occupancy_feature: features::OCCUPANCY_FEATURE.to_string(),
            change_threshold_mm: DEFAULT_CHANGE_THRESHOLD_MM,
            decision_threshold: None,
            send_interval_ms: DEFAULT_SEND_INTERVAL_MS,
            report_interval: DEFAULT_REPORT_INTERVAL,
            sort_input: true,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            fail_on_publish_error: false,
            sinks: SinkConfig::default(),
        }
    }
}

impl RunConfig {
    /// Read a JSON config; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text)?;
        log::info!("Loaded run config from {}", path.display());
        Ok(config)
    }

    /// File if given, otherwise defaults; env applied on top
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Some(v) = constants::env_string(ENV_FEATURES) {
            self.features_path = Some(PathBuf::from(v));
        }
        if let Some(v) = constants::env_string(ENV_MANIFEST) {
            self.manifest_path = Some(PathBuf::from(v));
        }
        if let Some(v) = constants::env_string(ENV_SLOT_ID) {
            self.default_slot = v;
        }
        if let Some(v) = constants::env_parse(ENV_CHANGE_THRESHOLD_MM) {
            self.change_threshold_mm = v;
        }
        if let Some(v) = constants::env_parse(ENV_DECISION_THRESHOLD) {
            self.decision_threshold = Some(v);
        }
        if let Some(v) = constants::env_parse(ENV_SEND_INTERVAL_MS) {
            self.send_interval_ms = v;
        }
        if let Some(v) = constants::env_parse(ENV_REPORT_INTERVAL) {
            self.report_interval = v;
        }
        if let Some(v) = constants::env_string(ENV_TOPIC_PREFIX) {
            self.topic_prefix = v;
        }
        if let Some(v) = constants::env_string(ENV_COLLECTOR_URL) {
            self.sinks.collector_url = Some(v);
        }
        if let Some(v) = constants::env_string(ENV_JSONL_DIR) {
            self.sinks.jsonl_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = constants::env_flag(ENV_FAIL_ON_PUBLISH_ERROR) {
            self.fail_on_publish_error = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_slot.trim().is_empty() {
            return Err(ConfigError::invalid("default_slot", "must not be empty"));
        }
        if features::feature_index(&self.occupancy_feature).is_none() {
            return Err(ConfigError::invalid(
                "occupancy_feature",
                format!("'{}' is not in the feature layout", self.occupancy_feature),
            ));
        }
        if !self.change_threshold_mm.is_finite() || self.change_threshold_mm <= 0.0 {
            return Err(ConfigError::invalid(
                "change_threshold_mm",
                format!("{} must be a positive distance", self.change_threshold_mm),
            ));
        }
        if let Some(t) = self.decision_threshold {
            ThresholdConfig::new(t)
                .ok_or_else(|| ConfigError::invalid("decision_threshold", format!("{} outside [0, 1]", t)))?;
        }
        if self.topic_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::invalid("topic_prefix", "must not be empty"));
        }
        if let Some(url) = &self.sinks.collector_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid("collector_url", format!("'{}' is not an http(s) URL", url)));
            }
        }
        Ok(())
    }

    pub fn features_path(&self) -> Result<&Path, ConfigError> {
        self.features_path.as_deref().ok_or(ConfigError::Missing("features_path"))
    }

    pub fn manifest_path(&self) -> Result<&Path, ConfigError> {
        self.manifest_path.as_deref().ok_or(ConfigError::Missing("manifest_path"))
    }

    pub fn occupancy_rule(&self) -> Result<OccupancyRule, ConfigError> {
        OccupancyRule::new(&self.occupancy_feature, self.change_threshold_mm)
            .map_err(|e| ConfigError::invalid("occupancy_feature", e.to_string()))
    }

    pub fn topics(&self) -> Topics {
        Topics::new(self.topic_prefix.clone())
    }
}
