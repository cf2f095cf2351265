//! Health and status endpoints

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::server::state::AppState;

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(health_summary))
            .route("/providers", web::get().to(provider_health)),
    );
}

/// Aggregate health summary
#[derive(Debug, Clone, Serialize)]
struct HealthSummary {
    status: &'static str,
    providers: usize,
    healthy_providers: usize,
    version: &'static str,
    timestamp: DateTime<Utc>,
}

/// Service health: healthy unless some enabled provider has tripped its
/// failure threshold
async fn health_summary(state: web::Data<AppState>) -> HttpResponse {
    debug!("health check requested");
    let statuses = state.directory.status_by_provider();
    let enabled = statuses.iter().filter(|status| status.enabled).count();
    let healthy = statuses
        .iter()
        .filter(|status| status.enabled && status.health.healthy)
        .count();

    HttpResponse::Ok().json(HealthSummary {
        status: if healthy == enabled { "healthy" } else { "degraded" },
        providers: statuses.len(),
        healthy_providers: healthy,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Per-provider identity and health, disabled providers included
async fn provider_health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.directory.status_by_provider())
}
