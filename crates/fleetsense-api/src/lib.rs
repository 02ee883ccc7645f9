//! Fleetsense API crate - axum HTTP boundary for the chat engine.
//!
//! Exposes the assistant endpoints (`/chatbot`, `/chatbot/clear`,
//! `/chatbot/suggestions`) plus a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
