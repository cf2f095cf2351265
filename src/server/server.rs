//! HTTP server bootstrap

use actix_web::{App, HttpServer as ActixHttpServer, middleware::DefaultHeaders, web};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::{Config, ServerConfig};
use crate::core::health::HealthProber;
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};

/// HTTP server wrapping the relay state
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: &Config) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self {
            config: config.server.clone(),
            state,
        })
    }

    /// Build the server around already-assembled state, e.g. with a custom
    /// usage sink
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config.server.clone(),
            state,
        }
    }

    /// Bind and run until shutdown. Also starts the background health
    /// prober tied to this state's directory.
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.bind_address();

        let prober = HealthProber::new(
            Arc::clone(&self.state.directory),
            self.state.config.gateway.probe_interval(),
        );
        let _prober_task = prober.spawn();

        info!(addr = %bind_addr, "starting HTTP server");
        let state = web::Data::new(self.state);

        let server = ActixHttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(TracingLogger::default())
                .wrap(DefaultHeaders::new().add(("Server", "ModelRelay")))
                .configure(routes::configure)
        })
        .bind(&bind_addr)
        .map_err(|e| GatewayError::config(format!("failed to bind {bind_addr}: {e}")))?
        .run();

        info!(addr = %bind_addr, "HTTP server listening");
        server
            .await
            .map_err(|e| GatewayError::internal(format!("server error: {e}")))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Run the relay from a loaded configuration
pub async fn run_server(config: Config) -> Result<()> {
    let server = HttpServer::new(&config)?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        providers = config.providers.len(),
        "model relay starting"
    );
    server.start().await
}
