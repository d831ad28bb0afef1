//! Transmission metrics and raw log handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::models::{LogEntry, MetricsView};
use crate::AppState;

const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Debug, Deserialize, Default)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

/// Latest edge-node counters (Traditional / EdgeAI / Reduction)
pub async fn get(State(state): State<AppState>) -> Json<MetricsView> {
    Json(state.store.read().await.metrics())
}

/// Raw messages, newest first
pub async fn log(State(state): State<AppState>, Query(query): Query<LogQuery>) -> Json<Vec<LogEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Json(state.store.read().await.log(limit))
}
