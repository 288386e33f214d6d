// Route exports
pub mod agents;
pub mod dispatch;

use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::core::{MatchEngine, RequestLifecycle};
use crate::models::HealthResponse;
use crate::store::{PresenceRegistry, RequestStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub presence: Arc<PresenceRegistry>,
    pub requests: Arc<RequestStore>,
    pub engine: Arc<MatchEngine>,
    pub lifecycle: Arc<RequestLifecycle>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(agents::configure)
            .configure(dispatch::configure),
    );
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}
