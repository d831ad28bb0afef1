//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    slots: usize,
    max_slots: usize,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (slots, max_slots) = {
        let store = state.store.read().await;
        (store.slot_count(), store.max_slots())
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        slots,
        max_slots,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
