//! Command handlers
//!
//! Each handler resolves the layered config, builds what it needs and
//! returns `anyhow::Result`; `main` turns an error into a non-zero exit.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use crate::logic::config::RunConfig;
use crate::logic::features::LayoutInfo;
use crate::logic::model::{ModelInfo, ModelManifest, StabilityPredictor};
use crate::logic::run_loop::{Pipeline, RunOptions, RunReport};
use crate::logic::sink::{FanoutSink, HttpSink, JsonlRecorder, LogSink};
use crate::logic::source::CsvFeatureSource;

use super::{RunArgs, ValidateArgs};

// ============================================================================
// SHARED
// ============================================================================

fn resolve_config(path: Option<&std::path::Path>) -> anyhow::Result<RunConfig> {
    RunConfig::resolve(path).context("loading run config")
}

fn load_predictor(config: &RunConfig) -> anyhow::Result<StabilityPredictor> {
    let manifest_path = config.manifest_path()?;
    let manifest = ModelManifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;

    let predictor = manifest
        .build_predictor(config.decision_threshold)
        .with_context(|| format!("building predictor from {}", manifest_path.display()))?;

    let info = predictor.info();
    log::info!(
        "Model ready: {} ({}, {} features, threshold {:.2})",
        info.name,
        info.kind,
        info.feature_count,
        info.threshold
    );
    Ok(predictor)
}

/// Sinks selected by the config; an empty fanout is allowed
pub fn build_sink(config: &RunConfig) -> anyhow::Result<FanoutSink> {
    let mut sink = FanoutSink::new();

    if config.sinks.log {
        sink = sink.with(LogSink::new(config.topics()));
    }
    if let Some(dir) = &config.sinks.jsonl_dir {
        let recorder = JsonlRecorder::new(dir)
            .with_context(|| format!("opening JSONL directory {}", dir.display()))?;
        sink = sink.with(recorder);
    }
    if let Some(url) = &config.sinks.collector_url {
        let http = HttpSink::new(url, config.topics(), Duration::from_millis(config.sinks.http_timeout_ms));
        log::info!("Publishing to collector at {}", http.endpoint());
        sink = sink.with(http);
    }

    if sink.is_empty() {
        log::warn!("No sinks configured, transmissions are only counted");
    }
    Ok(sink)
}

// ============================================================================
// RUN
// ============================================================================

pub fn run(args: &RunArgs) -> anyhow::Result<RunReport> {
    let mut config = resolve_config(args.common.config.as_deref())?;
    args.apply(&mut config);
    run_with(&config, args.json)
}

/// Run with an already layered config
pub fn run_with(config: &RunConfig, json: bool) -> anyhow::Result<RunReport> {
    config.validate()?;

    let predictor = load_predictor(config)?;
    let rule = config.occupancy_rule()?;
    let features_path = config.features_path()?;

    let source = CsvFeatureSource::open(features_path, rule, config.default_slot.clone())
        .with_context(|| format!("opening features {}", features_path.display()))?;

    let sink = build_sink(config)?;
    let mut pipeline = Pipeline::new(predictor, sink, RunOptions::from(config));

    let report = if config.sort_input {
        pipeline.run(source.into_sorted()?)?
    } else {
        pipeline.run(source)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.counters);
    }
    Ok(report)
}

// ============================================================================
// VALIDATE
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub model: ModelInfo,
    pub layout: LayoutInfo,
    /// Features CSV whose header was checked, if any
    pub features: Option<String>,
}

pub fn validate(args: &ValidateArgs) -> anyhow::Result<ValidationReport> {
    let mut config = resolve_config(args.common.config.as_deref())?;
    args.common.apply(&mut config);
    validate_with(&config)
}

pub fn validate_with(config: &RunConfig) -> anyhow::Result<ValidationReport> {
    config.validate()?;

    let predictor = load_predictor(config)?;

    let features = match &config.features_path {
        Some(path) => {
            let rule = config.occupancy_rule()?;
            CsvFeatureSource::open(path, rule, config.default_slot.clone())
                .with_context(|| format!("checking header of {}", path.display()))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let report = ValidationReport {
        model: predictor.info().clone(),
        layout: LayoutInfo::current(),
        features,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}

// ============================================================================
// LAYOUT
// ============================================================================

pub fn layout() -> anyhow::Result<LayoutInfo> {
    let info = LayoutInfo::current();
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(info)
}
