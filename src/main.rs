//! ModelRelay - OpenAI-compatible chat completion router

use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use modelrelay::config::{Config, DEFAULT_CONFIG_PATH};
use modelrelay::server;

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match Config::from_file(&config_path).await {
        Ok(config) => {
            info!(path = %config_path, "configuration loaded");
            config
        }
        Err(err) => {
            warn!(path = %config_path, error = %err, "configuration unavailable, starting with defaults");
            Config::default()
        }
    };

    match server::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
