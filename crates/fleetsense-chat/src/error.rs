//! Error types for the conversational engine.

use fleetsense_core::error::FleetsenseError;

/// Errors from the chat engine.
///
/// Only `Disabled` ever reaches a caller of [`crate::ChatEngine::handle_message`];
/// validation failures are degraded into well-formed replies inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("invalid telemetry field '{field}': {reason}")]
    Validation { field: String, reason: String },
}

impl ChatError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        ChatError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ChatError> for FleetsenseError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation { .. } => FleetsenseError::Telemetry(err.to_string()),
            _ => FleetsenseError::Chat(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_display() {
        assert_eq!(ChatError::Disabled.to_string(), "chat is disabled");
    }

    #[test]
    fn test_validation_display() {
        let err = ChatError::validation("avg_speed", "missing");
        assert_eq!(
            err.to_string(),
            "invalid telemetry field 'avg_speed': missing"
        );
    }

    #[test]
    fn test_into_fleetsense_error() {
        let err: FleetsenseError = ChatError::validation("distance", "not a number").into();
        assert!(matches!(err, FleetsenseError::Telemetry(_)));

        let err: FleetsenseError = ChatError::Disabled.into();
        assert!(matches!(err, FleetsenseError::Chat(_)));
    }
}
