use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use relay_engine::{create_default_registry, Dispatcher, FsArtifactStore};
use relay_llm::{GeminiConfig, GoogleProvider};
use relay_settings::RelaySettings;
use relay_telemetry::{init_telemetry, TelemetryConfig};
use secrecy::SecretString;

/// WebSocket relay between browser clients and Gemini tool calling.
#[derive(Debug, Parser)]
#[command(name = "relay", version)]
struct Cli {
    /// Settings file (defaults to ~/.relay/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Listen port, overriding settings and RELAY_PORT.
    #[arg(long)]
    port: Option<u16>,
}

fn load_settings(cli: &Cli) -> anyhow::Result<RelaySettings> {
    let path = cli.settings.clone().unwrap_or_else(relay_settings::settings_path);
    let mut settings = relay_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    init_telemetry(&TelemetryConfig::from_level_name(
        &settings.logging.level,
        settings.logging.json,
    ))?;
    tracing::info!("Starting relay server");

    let Some(api_key) = settings.gemini.api_key.clone() else {
        bail!("GEMINI_API_KEY is not set");
    };
    let provider = Arc::new(GoogleProvider::new(GeminiConfig {
        api_key: SecretString::from(api_key),
        model: settings.gemini.model.clone(),
        draft_model: settings.gemini.draft_model.clone(),
        base_url: settings.gemini.base_url.clone(),
        request_timeout: Duration::from_secs(settings.gemini.request_timeout_secs),
    })?);

    let downloads_dir = PathBuf::from(&settings.artifacts.downloads_dir);
    std::fs::create_dir_all(&downloads_dir)
        .with_context(|| format!("failed to create {}", downloads_dir.display()))?;
    let store = Arc::new(FsArtifactStore::new(
        &downloads_dir,
        settings.artifacts.public_prefix.clone(),
    ));

    let registry = Arc::new(create_default_registry(provider.clone(), store));
    tracing::info!(tools = ?registry.names(), "tool registry ready");
    let dispatcher = Arc::new(Dispatcher::new(provider, registry));

    let config = relay_server::ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
        heartbeat_interval: Duration::from_millis(settings.server.heartbeat_interval_ms),
        downloads_dir,
        downloads_prefix: settings.artifacts.public_prefix.clone(),
    };
    let handle = relay_server::start(config, dispatcher)
        .await
        .context("failed to start server")?;

    tracing::info!(addr = %handle.addr(), "relay server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::parse_from(["relay", "--settings", "/etc/relay.json", "--port", "8080"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/etc/relay.json")));
        assert_eq!(cli.port, Some(8080));
    }

    #[test]
    fn port_flag_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9000}}"#).unwrap();

        let cli = Cli::parse_from([
            "relay",
            "--settings",
            path.to_str().unwrap(),
            "--port",
            "8081",
        ]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.server.port, 8081);
    }
}
