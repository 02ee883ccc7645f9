//! CLI argument definitions for the Fleetsense server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Fleetsense - conversational assistant for fleet telemetry.
#[derive(Parser, Debug, Default)]
#[command(name = "fleetsense", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind the API server to.
    #[arg(long = "bind")]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// JSON file with the trip summary (or trip list) to answer from.
    #[arg(short = 's', long = "summary")]
    pub summary: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > FLEETSENSE_CONFIG env var > ~/.fleetsense/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("FLEETSENSE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > FLEETSENSE_PORT env var > config file value > 5050.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("FLEETSENSE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        5050
    }

    /// Bind address override, if given.
    pub fn resolve_bind(&self) -> Option<String> {
        self.bind.clone()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        match self.log_level {
            Some(ref level) => level.clone(),
            None if config_level.trim().is_empty() => "info".to_string(),
            None => config_level.to_string(),
        }
    }

    /// Resolve the trip summary file.
    ///
    /// Priority: --summary flag > config file value. `None` means no
    /// server-side summary; requests must carry their own telemetry.
    pub fn resolve_summary_path(&self, config_path: &str) -> Option<PathBuf> {
        if let Some(ref p) = self.summary {
            return Some(p.clone());
        }
        if config_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(config_path))
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".fleetsense").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".fleetsense").join("config.toml");
    }
    PathBuf::from("config.toml")
}
