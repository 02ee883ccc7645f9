use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FleetsenseError, Result};

/// Top-level configuration for the Fleetsense assistant.
///
/// Loaded from `~/.fleetsense/config.toml` by default. Every section is
/// optional in the file; missing sections and fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetsenseConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl FleetsenseConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetsenseConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| FleetsenseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Optional JSON file holding the driver's trips or a precomputed summary.
    /// Empty means no server-side telemetry.
    pub summary_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            summary_path: String::new(),
        }
    }
}

/// Conversational engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether the assistant answers at all.
    pub enabled: bool,
    /// Turns retained per session; older turns are evicted first.
    pub max_turns: usize,
    /// Inactivity after which a session may be swept.
    pub session_timeout_minutes: u32,
    /// How often the background sweeper runs.
    pub sweep_interval_secs: u64,
    /// Minimum matched keyword groups for a rule to win classification.
    pub min_confidence_groups: u32,
    /// Messages with fewer words than this may be treated as follow-ups.
    pub short_message_words: usize,
    /// Longer messages are truncated before classification.
    pub max_message_chars: usize,
    /// Upper bound on suggestions per reply.
    pub max_suggestions: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_turns: 20,
            session_timeout_minutes: 30,
            sweep_interval_secs: 60,
            min_confidence_groups: 1,
            short_message_words: 4,
            max_message_chars: 2000,
            max_suggestions: 4,
        }
    }
}

/// HTTP boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener to.
    pub bind: String,
    /// Port for the HTTP listener.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5050,
        }
    }
}
