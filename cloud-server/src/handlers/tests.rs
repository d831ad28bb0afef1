//! Router-level handler tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::store::CollectorStore;
use crate::{create_router, AppState};

fn app() -> Router {
    app_with(Config::default())
}

fn app_with(config: Config) -> Router {
    create_router(AppState {
        store: CollectorStore::shared(config.history_capacity, config.max_slots),
        config,
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["slots"], 0);
    assert_eq!(body["max_slots"], 1000);
}

#[tokio::test]
async fn test_ingest_batch_then_query_slot() {
    let app = app();
    let batch = json!({
        "messages": [
            { "topic": "smartparking/slot1/event", "payload": "CHANGE: state=1, ts=2024-05-01 12:00:00.000" },
            { "topic": "smartparking/slot1/state", "payload": "1" },
            { "topic": "smartparking/slot2/event", "payload": "PRED_CHANGE: prob=0.876, ts=2024-05-01 12:00:01.000" }
        ]
    });

    let (status, body) = send(&app, post_json("/api/v1/messages", batch)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], 3);
    assert_eq!(body["slots"], json!(["slot1", "slot2"]));

    let (status, grid) = send(&app, get("/api/v1/slots")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grid[0]["slot_id"], "slot1");
    assert_eq!(grid[0]["status"], "OCCUPIED");
    assert_eq!(grid[1]["status"], "NO_DATA");

    let (status, detail) = send(&app, get("/api/v1/slots/slot2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["events"][0]["kind"], "PRED_CHANGE");
    assert!((detail["predictions"][0]["probability"].as_f64().unwrap() - 0.876).abs() < 1e-6);
}

#[tokio::test]
async fn test_single_message_and_metrics() {
    let app = app();
    let message = json!({
        "topic": "smartparking/metrics/transmissions",
        "payload": "Traditional=1000, EdgeAI=483, Reduction=51.70%"
    });

    let (status, _) = send(&app, post_json("/api/v1/messages", message)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, metrics) = send(&app, get("/api/v1/metrics")).await;
    assert_eq!(metrics["traditional"], 1000);
    assert_eq!(metrics["edge_ai"], 483);
    assert_eq!(metrics["reduction"], 51.7);
    assert_eq!(metrics["messages_ingested"], 1);
}

#[tokio::test]
async fn test_log_limit() {
    let app = app();
    for i in 0..5 {
        let message = json!({ "topic": "smartparking/slot3/state", "payload": (i % 2).to_string() });
        send(&app, post_json("/api/v1/messages", message)).await;
    }

    let (status, log) = send(&app, get("/api/v1/log?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.as_array().unwrap().len(), 2);
    assert_eq!(log[0]["payload"], "0");

    let (_, recent) = send(&app, get("/api/v1/events/recent?per_slot=3")).await;
    assert_eq!(recent.as_array().unwrap().len(), 3);
    assert_eq!(recent[0]["slot_id"], "slot3");
}

#[tokio::test]
async fn test_unknown_slot_is_404() {
    let (status, body) = send(&app(), get("/api/v1/slots/slot99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_invalid_bodies_are_400() {
    let app = app();

    let (status, body) = send(&app, post_json("/api/v1/messages", json!({ "topic": "", "payload": "1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = send(&app, post_json("/api/v1/messages", json!({ "messages": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/api/v1/messages", json!({ "nope": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slot_cap_rejects_whole_batch() {
    let app = app_with(Config { max_slots: 2, ..Config::default() });

    let first = json!({ "topic": "smartparking/slot1/state", "payload": "1" });
    let (status, _) = send(&app, post_json("/api/v1/messages", first)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let batch = json!({
        "messages": [
            { "topic": "smartparking/slot2/state", "payload": "0" },
            { "topic": "smartparking/slot3/state", "payload": "0" }
        ]
    });
    let (status, body) = send(&app, post_json("/api/v1/messages", batch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (_, grid) = send(&app, get("/api/v1/slots")).await;
    assert_eq!(grid.as_array().unwrap().len(), 1);

    let known = json!({ "topic": "smartparking/slot1/state", "payload": "0" });
    let (status, _) = send(&app, post_json("/api/v1/messages", known)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}
