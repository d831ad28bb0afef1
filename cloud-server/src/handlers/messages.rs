//! Message ingest handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::models::{IngestRequest, IngestResponse};
use crate::{AppResult, AppState};

/// Accept one message or a batch from an edge node
pub async fn ingest(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<IngestResponse>)> {
    let Json(request) = body?;
    let messages = request.into_messages()?;

    let now = chrono::Utc::now();
    let mut slots: Vec<String> = Vec::new();
    {
        let mut store = state.store.write().await;
        store.check_capacity(messages.iter().map(|m| m.topic.as_str()))?;
        for message in &messages {
            let outcome = store.ingest(&message.topic, &message.payload, now)?;
            tracing::debug!(topic = %message.topic, kind = outcome.kind, "ingested");
            if let Some(slot) = outcome.slot_id {
                if !slots.contains(&slot) {
                    slots.push(slot);
                }
            }
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            accepted: messages.len(),
            slots,
            server_time: now.timestamp(),
        }),
    ))
}
