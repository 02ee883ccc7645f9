//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its request via axum extractors, calls the chat
//! engine, and returns JSON responses.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fleetsense_chat::markup;
use fleetsense_chat::RawSummary;

use crate::error::ApiError;
use crate::state::{parse_summary, AppState};

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /chatbot.
#[derive(Debug, Default, Deserialize)]
pub struct ChatbotRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Precomputed summary for this request (metric name -> value).
    #[serde(default)]
    pub telemetry: Option<Value>,
    /// Individual trips for this request, most recent first.
    #[serde(default)]
    pub trips: Option<Value>,
    /// `"html"` renders the reply markup; anything else returns it as-is.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatbotResponse {
    pub response: String,
    pub suggestions: Vec<String>,
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub status: String,
    pub conversation_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionsParams {
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub chat_enabled: bool,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /chatbot - answer one message.
pub async fn chatbot(
    State(state): State<AppState>,
    Json(req): Json<ChatbotRequest>,
) -> Result<Json<ChatbotResponse>, ApiError> {
    let request_summary = request_summary(&req);
    let summary = request_summary
        .as_ref()
        .or(state.summary.as_deref());

    let reply = state
        .engine
        .handle_message(req.conversation_id.as_deref(), &req.message, summary)?;

    let response = match req.format.as_deref() {
        Some(f) if f.eq_ignore_ascii_case("html") => markup::to_html(&reply.response),
        _ => reply.response,
    };

    Ok(Json(ChatbotResponse {
        response,
        suggestions: reply.suggestions,
        conversation_id: reply.conversation_id,
    }))
}

/// POST /chatbot/clear - drop a conversation's history.
pub async fn clear_chat(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<ClearResponse>, ApiError> {
    let conversation_id = req
        .conversation_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("conversation_id is required".to_string()))?;

    state.engine.clear(&conversation_id);

    Ok(Json(ClearResponse {
        status: "cleared".to_string(),
        conversation_id,
    }))
}

/// GET /chatbot/suggestions - suggestions for a conversation, or defaults.
pub async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsParams>,
) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: state.engine.suggestions(params.conversation_id.as_deref()),
    })
}

/// POST /chatbot/suggestions - same as GET, with an optional JSON body.
pub async fn suggestions_post(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let params: SuggestionsParams = if body.iter().all(u8::is_ascii_whitespace) {
        SuggestionsParams::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    Ok(Json(SuggestionsResponse {
        suggestions: state.engine.suggestions(params.conversation_id.as_deref()),
    }))
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.engine.store().len(),
        chat_enabled: state.engine.config().enabled,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Telemetry carried by the request itself, if any.
///
/// Unreadable telemetry becomes an empty summary, which the engine reports
/// as unavailable trip data instead of failing the request.
fn request_summary(req: &ChatbotRequest) -> Option<RawSummary> {
    let value = req.telemetry.clone().or_else(|| req.trips.clone())?;
    match parse_summary(value) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable request telemetry");
            Some(RawSummary::new())
        }
    }
}
