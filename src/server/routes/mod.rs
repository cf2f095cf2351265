//! HTTP route modules

use actix_web::web;

pub mod chat;
pub mod health;
pub mod models;

/// Wire every route onto the app
pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure_routes(cfg);
    cfg.service(
        web::scope("/v1")
            .route("/chat/completions", web::post().to(chat::chat_completions))
            .route("/models", web::get().to(models::list_models)),
    );
}
