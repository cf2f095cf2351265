//! Model listing endpoint

use actix_web::{HttpResponse, web};
use tracing::debug;

use crate::core::types::ModelList;
use crate::server::state::AppState;

/// List every model the relay can currently route, OpenAI list shape
pub async fn list_models(state: web::Data<AppState>) -> HttpResponse {
    let models = state.directory.all_models();
    debug!(count = models.len(), "listing models");
    HttpResponse::Ok().json(ModelList::new(models))
}
