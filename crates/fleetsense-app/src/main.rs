//! Fleetsense application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Load the server-side trip summary, if one is configured
//! 3. Start the idle-session sweeper
//! 4. Start the axum REST API server

mod cli;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fleetsense_api::routes;
use fleetsense_api::state::{self, AppState};
use fleetsense_chat::run_sweeper;
use fleetsense_core::config::FleetsenseConfig;
use fleetsense_core::error::FleetsenseError;

use cli::CliArgs;

/// Where the running configuration came from.
#[derive(Debug)]
enum ConfigSource {
    File,
    Missing,
    Invalid(FleetsenseError),
}

/// Read the config file, falling back to defaults without losing the reason.
fn read_config(path: &Path) -> (FleetsenseConfig, ConfigSource) {
    if !path.exists() {
        return (FleetsenseConfig::default(), ConfigSource::Missing);
    }
    match FleetsenseConfig::load(path) {
        Ok(config) => (config, ConfigSource::File),
        Err(e) => (FleetsenseConfig::default(), ConfigSource::Invalid(e)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply; the
    // outcome is logged once the subscriber is installed.
    let config_file = args.resolve_config_path();
    let (mut config, source) = read_config(&config_file);

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Fleetsense v{}", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File => {
            tracing::info!(path = %config_file.display(), "Configuration loaded")
        }
        ConfigSource::Missing => {
            tracing::info!(path = %config_file.display(), "No config file, using defaults")
        }
        ConfigSource::Invalid(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    config.api.port = args.resolve_port(config.api.port);
    if let Some(bind) = args.resolve_bind() {
        config.api.bind = bind;
    }

    // Trip summary. A bad file is not fatal: requests can still carry telemetry.
    let summary = match args.resolve_summary_path(&config.general.summary_path) {
        Some(path) => match state::load_summary(&path) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Trip summary unavailable");
                None
            }
        },
        None => {
            tracing::info!("No trip summary configured; using per-request telemetry only");
            None
        }
    };

    if !config.chat.enabled {
        tracing::warn!("Chat is disabled in config; /chatbot will return 503");
    }

    let state = AppState::new(config.clone(), summary);

    // === Background tasks ===

    let sweep_every = Duration::from_secs(config.chat.sweep_interval_secs.max(1));
    let store = state.store();
    tokio::spawn(async move {
        run_sweeper(store, sweep_every).await;
    });

    // === API server ===

    if let Err(e) = routes::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!(
            "Try: FLEETSENSE_PORT={} cargo run -p fleetsense-app",
            config.api.port.saturating_add(1)
        );
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_config_missing_file() {
        let (config, source) = read_config(Path::new("/nonexistent/fleetsense.toml"));
        assert!(matches!(source, ConfigSource::Missing));
        assert_eq!(config.api.port, 5050);
    }

    #[test]
    fn test_read_config_invalid_file_keeps_reason() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[chat\nmax_turns = ").unwrap();
        let (config, source) = read_config(file.path());
        assert!(matches!(source, ConfigSource::Invalid(FleetsenseError::Config(_))));
        assert!(config.chat.enabled);
    }

    #[test]
    fn test_read_config_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[api]\nport = 6060\n").unwrap();
        let (config, source) = read_config(file.path());
        assert!(matches!(source, ConfigSource::File));
        assert_eq!(config.api.port, 6060);
    }
}
