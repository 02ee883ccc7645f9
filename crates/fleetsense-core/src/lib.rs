pub mod config;
pub mod error;

pub use config::{ApiConfig, ChatConfig, FleetsenseConfig, GeneralConfig};
pub use error::{FleetsenseError, Result};
