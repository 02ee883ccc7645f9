use thiserror::Error;

/// Top-level error type for Fleetsense.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for FleetsenseError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FleetsenseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for FleetsenseError {
    fn from(err: toml::de::Error) -> Self {
        FleetsenseError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FleetsenseError {
    fn from(err: toml::ser::Error) -> Self {
        FleetsenseError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FleetsenseError {
    fn from(err: serde_json::Error) -> Self {
        FleetsenseError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Fleetsense operations.
pub type Result<T> = std::result::Result<T, FleetsenseError>;
