//! Slot grid and timeline handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::models::{RecentEvent, SlotDetail, SlotSummary};
use crate::{AppError, AppResult, AppState};

/// Timeline entries returned when no limit is given
const DEFAULT_TIMELINE_LIMIT: usize = 200;

#[derive(Debug, Deserialize, Default)]
pub struct TimelineQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RecentQuery {
    pub per_slot: Option<usize>,
    pub limit: Option<usize>,
}

/// Latest state of every known slot
pub async fn list(State(state): State<AppState>) -> Json<Vec<SlotSummary>> {
    Json(state.store.read().await.slots())
}

/// Events, prediction probabilities and occupancy for one slot
pub async fn get(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> AppResult<Json<SlotDetail>> {
    let store = state.store.read().await;
    let limit = query.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT).min(store.capacity());

    store
        .slot(&slot_id, limit)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Slot {} not found", slot_id)))
}

/// Newest events across all slots
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<RecentEvent>> {
    let per_slot = query.per_slot.unwrap_or(6);
    let limit = query.limit.unwrap_or(12);
    Json(state.store.read().await.recent_events(per_slot, limit))
}
