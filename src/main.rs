mod config;
mod core;
mod models;
mod routes;
mod services;
mod store;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use config::Settings;
use core::{MatchEngine, RequestLifecycle};
use models::DispatchWeights;
use routes::AppState;
use services::{ProfileClient, ProfileCollections, PushClient};
use store::{PresenceRegistry, RequestStore};

/// JSON error response for payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting agent dispatch service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize the profile document-store client
    let collections = ProfileCollections {
        agents: settings.collection.agents,
        listings: settings.collection.listings,
        matches: settings.collection.matches,
    };

    let profiles = Arc::new(ProfileClient::new(
        settings.profiles.endpoint,
        settings.profiles.api_key,
        settings.profiles.project_id,
        settings.profiles.database_id,
        collections,
        settings.profiles.cache_capacity,
        settings.profiles.cache_ttl_secs,
    ));

    info!("Profile store client initialized");

    // Initialize push delivery
    let push = Arc::new(PushClient::new(
        settings.push.expo_url,
        settings.push.fcm_url,
        settings.push.fcm_server_key,
    ));

    // Ephemeral stores
    let presence = Arc::new(PresenceRegistry::new(Duration::from_secs(
        settings.presence.ttl_secs,
    )));
    let requests = Arc::new(RequestStore::new(Duration::from_secs(
        settings.request.ttl_secs,
    )));

    info!(
        "Stores initialized (presence TTL: {}s, request TTL: {}s)",
        settings.presence.ttl_secs, settings.request.ttl_secs
    );

    // Dispatch engine with configured scoring
    let weights = DispatchWeights {
        eta: settings.scoring.weights.eta,
        load: settings.scoring.weights.load,
        rating: settings.scoring.weights.rating,
    };

    let engine = Arc::new(
        MatchEngine::new(
            Arc::clone(&presence),
            Arc::clone(&requests),
            profiles.clone(),
            push.clone(),
        )
        .with_scoring(weights, settings.scoring.avg_speed_kmh)
        .with_offer_ttl(Duration::from_secs(settings.request.offer_ttl_secs)),
    );

    info!(
        "Match engine initialized (weights: {:?}, avg speed: {} km/h)",
        weights, settings.scoring.avg_speed_kmh
    );

    let lifecycle = Arc::new(RequestLifecycle::new(
        Arc::clone(&presence),
        Arc::clone(&requests),
        profiles.clone(),
    ));

    // Build application state
    let app_state = AppState {
        presence,
        requests,
        engine,
        lifecycle,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
