//! Application state shared across all route handlers.
//!
//! AppState holds the chat engine and the server-side trip summary. It is
//! passed to handlers via axum's State extractor.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use fleetsense_chat::{ChatEngine, ConversationStore, RawSummary, TripRecord};
use fleetsense_core::config::FleetsenseConfig;
use fleetsense_core::error::{FleetsenseError, Result};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<FleetsenseConfig>,
    /// Conversational engine, owning the session store.
    pub engine: Arc<ChatEngine>,
    /// Trip summary used when a request carries no telemetry of its own.
    pub summary: Option<Arc<RawSummary>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with a fresh engine.
    pub fn new(config: FleetsenseConfig, summary: Option<RawSummary>) -> Self {
        let engine = ChatEngine::new(config.chat.clone());
        Self::with_engine(config, engine, summary)
    }

    /// Create a new AppState around an existing engine.
    pub fn with_engine(
        config: FleetsenseConfig,
        engine: ChatEngine,
        summary: Option<RawSummary>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            summary: summary.map(Arc::new),
            start_time: Instant::now(),
        }
    }

    /// Session store, for the background sweeper.
    pub fn store(&self) -> Arc<ConversationStore> {
        Arc::clone(self.engine.store())
    }
}

/// Interpret JSON telemetry: either an array of trip records or a
/// precomputed summary object.
pub fn parse_summary(value: Value) -> Result<RawSummary> {
    match value {
        Value::Array(_) => {
            let trips: Vec<TripRecord> = serde_json::from_value(value)?;
            Ok(RawSummary::from_trips(&trips))
        }
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(FleetsenseError::Serialization(format!(
            "expected a trips array or summary object, got {}",
            other
        ))),
    }
}

/// Load the server-side summary from a JSON file.
pub fn load_summary(path: &Path) -> Result<RawSummary> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let summary = parse_summary(value)?;
    tracing::info!("Trip summary loaded from {}", path.display());
    Ok(summary)
}
