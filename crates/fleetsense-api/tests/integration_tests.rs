//! Integration tests for the Fleetsense API.
//!
//! Each test builds its own router over a fresh engine and drives it with
//! `oneshot` requests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use fleetsense_api::create_router;
use fleetsense_api::handlers::{
    ChatbotResponse, ClearResponse, HealthResponse, SuggestionsResponse,
};
use fleetsense_api::state::AppState;
use fleetsense_chat::RawSummary;
use fleetsense_core::config::FleetsenseConfig;

// =============================================================================
// Helpers
// =============================================================================

fn server_summary() -> RawSummary {
    RawSummary::new()
        .with("avg_speed", 72.0)
        .with("max_speed", 118.0)
        .with("avg_rpm", 2900.0)
        .with("max_rpm", 3800.0)
        .with("distance", 360.0)
        .with("fuel_consumed", 30.0)
        .with("brake_events", 18)
        .with("trip_count", 4)
        .with("behavior", "Safe")
}

fn make_state() -> AppState {
    AppState::new(FleetsenseConfig::default(), Some(server_summary()))
}

fn make_app() -> axum::Router {
    create_router(make_state())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn chat(app: &axum::Router, body: Value) -> ChatbotResponse {
    let resp = app
        .clone()
        .oneshot(post_json("/chatbot", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let resp = make_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_sessions, 0);
    assert!(health.chat_enabled);
}

// =============================================================================
// POST /chatbot
// =============================================================================

#[tokio::test]
async fn test_chatbot_new_conversation() {
    let app = make_app();
    let reply = chat(&app, json!({"message": "hello"})).await;
    assert!(reply.response.starts_with("Hello!"));
    assert!(!reply.conversation_id.is_empty());
    assert!(!reply.suggestions.is_empty());
}

#[tokio::test]
async fn test_chatbot_uses_server_summary() {
    let app = make_app();
    let reply = chat(
        &app,
        json!({"message": "How can I save fuel?", "conversation_id": "c1"}),
    )
    .await;
    assert_eq!(reply.conversation_id, "c1");
    assert!(reply.response.contains("12.0 km/L"));
    assert!(reply.suggestions.len() <= 4);
}

#[tokio::test]
async fn test_chatbot_follow_up_across_requests() {
    let app = make_app();
    chat(
        &app,
        json!({"message": "How is my fuel efficiency?", "conversation_id": "c2"}),
    )
    .await;
    let reply = chat(
        &app,
        json!({"message": "what about speed instead?", "conversation_id": "c2"}),
    )
    .await;
    assert!(reply.response.contains("**Speed**"));
    assert!(!reply.response.contains("**Fuel efficiency**"));
}

#[tokio::test]
async fn test_chatbot_request_trips_override_server_summary() {
    let app = make_app();
    let reply = chat(
        &app,
        json!({
            "message": "compare my trips",
            "trips": [
                {"distance_km": 50.0, "avg_speed_kmph": 85.0, "max_rpm": 3600.0, "fuel_consumed": 5.0, "brake_events": 4},
                {"distance_km": 40.0, "avg_speed_kmph": 60.0, "max_rpm": 2900.0, "fuel_consumed": 4.0, "brake_events": 6}
            ]
        }),
    )
    .await;
    assert!(reply.response.contains("+25.0 km/h"));
    assert!(reply.response.contains("driving faster lately"));
}

#[tokio::test]
async fn test_chatbot_invalid_telemetry_is_graceful() {
    let app = make_app();
    let reply = chat(
        &app,
        json!({
            "message": "analyze my trips",
            "telemetry": {"avg_speed": "fast", "distance": 10, "fuel_consumed": 1}
        }),
    )
    .await;
    assert!(reply
        .response
        .starts_with("I couldn't access your trip data right now"));
    assert!(reply.suggestions.is_empty());
}

#[tokio::test]
async fn test_chatbot_no_summary_anywhere_is_graceful() {
    let app = create_router(AppState::new(FleetsenseConfig::default(), None));
    let reply = chat(&app, json!({"message": "what is my driving score"})).await;
    assert!(reply.response.contains("couldn't access your trip data"));

    // Data-free intents still work.
    let reply = chat(&app, json!({"message": "any driving tips?"})).await;
    assert!(reply.response.contains("Eco-driving tips"));
}

#[tokio::test]
async fn test_chatbot_unknown_message() {
    let reply = chat(&make_app(), json!({"message": "purple elephants"})).await;
    assert!(reply.response.contains("rephrase"));
    assert!(reply.suggestions.is_empty());
}

#[tokio::test]
async fn test_chatbot_html_format() {
    let reply = chat(
        &make_app(),
        json!({"message": "what can you do", "format": "html"}),
    )
    .await;
    assert!(reply.response.starts_with("<strong>I can help you with:</strong>"));
    assert!(reply.response.contains("<li>Fuel efficiency advice</li>"));
    assert!(!reply.response.contains("**"));
}

#[tokio::test]
async fn test_chatbot_disabled_returns_503() {
    let mut config = FleetsenseConfig::default();
    config.chat.enabled = false;
    let app = create_router(AppState::new(config, None));
    let resp = app
        .oneshot(post_json("/chatbot", json!({"message": "hello"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["error"], "service_unavailable");
}

// =============================================================================
// POST /chatbot/clear
// =============================================================================

#[tokio::test]
async fn test_clear_is_idempotent() {
    let state = make_state();
    let app = create_router(state.clone());
    chat(&app, json!({"message": "hello", "conversation_id": "c3"})).await;

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(post_json("/chatbot/clear", json!({"conversation_id": "c3"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ClearResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body.status, "cleared");
        assert!(state.engine.session("c3").unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_clear_requires_conversation_id() {
    let resp = make_app()
        .oneshot(post_json("/chatbot/clear", json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["error"], "bad_request");
}

// =============================================================================
// /chatbot/suggestions
// =============================================================================

#[tokio::test]
async fn test_suggestions_defaults_without_turns() {
    let resp = make_app()
        .oneshot(
            Request::get("/chatbot/suggestions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: SuggestionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.suggestions.len(), 4);
    assert!(body.suggestions.contains(&"How can I save fuel?".to_string()));
}

#[tokio::test]
async fn test_suggestions_post_empty_body() {
    let resp = make_app()
        .oneshot(
            Request::post("/chatbot/suggestions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: SuggestionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.suggestions.len(), 4);
}

#[tokio::test]
async fn test_suggestions_follow_last_turn() {
    let app = make_app();
    let reply = chat(
        &app,
        json!({"message": "compare my trips", "conversation_id": "c4"}),
    )
    .await;

    let resp = app
        .clone()
        .oneshot(
            Request::get("/chatbot/suggestions?conversation_id=c4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body: SuggestionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.suggestions, reply.suggestions);

    let resp = app
        .oneshot(post_json(
            "/chatbot/suggestions",
            json!({"conversation_id": "c4"}),
        ))
        .await
        .unwrap();
    let body: SuggestionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body.suggestions, reply.suggestions);
}
