use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::DispatchError;
use crate::models::{
    ErrorResponse, GeoPoint, GoOfflineBody, GoOnlineBody, HeartbeatBody, OnlineAgentsResponse,
};
use crate::routes::AppState;

/// Configure all presence-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/agents/online", web::post().to(go_online))
        .route("/agents/heartbeat", web::post().to(heartbeat))
        .route("/agents/offline", web::post().to(go_offline))
        .route("/agents", web::get().to(list_online_agents))
        .route("/agents/{agent_id}", web::get().to(get_agent));
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Agent goes online (manual)
///
/// POST /api/v1/agents/online
async fn go_online(
    state: web::Data<AppState>,
    body: web::Json<GoOnlineBody>,
) -> Result<HttpResponse, DispatchError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_error(errors));
    }

    let presence = state
        .presence
        .set_online(
            &body.agent_id,
            GeoPoint::new(body.lat, body.lng),
            body.load,
            body.rating,
        )
        .await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Agent is online",
        "presence": presence,
    })))
}

/// Continuous location/workload update from an online agent
///
/// POST /api/v1/agents/heartbeat
///
/// Rejected with 403 if the agent never went online (or its presence has
/// expired); heartbeats do not create presence.
async fn heartbeat(
    state: web::Data<AppState>,
    body: web::Json<HeartbeatBody>,
) -> Result<HttpResponse, DispatchError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_error(errors));
    }

    let presence = state
        .presence
        .heartbeat(
            &body.agent_id,
            GeoPoint::new(body.lat, body.lng),
            body.load,
            body.rating,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Location updated",
        "presence": presence,
    })))
}

/// Agent goes offline (manual, immediate)
///
/// POST /api/v1/agents/offline
async fn go_offline(
    state: web::Data<AppState>,
    body: web::Json<GoOfflineBody>,
) -> Result<HttpResponse, DispatchError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_error(errors));
    }

    state.presence.set_offline(&body.agent_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Agent is offline",
        "agentId": body.agent_id,
    })))
}

/// List every agent currently online
///
/// GET /api/v1/agents
async fn list_online_agents(state: web::Data<AppState>) -> Result<HttpResponse, DispatchError> {
    let agents = state.presence.list_online().await;
    let count = agents.len();

    Ok(HttpResponse::Ok().json(OnlineAgentsResponse { agents, count }))
}

/// Get a single online agent
///
/// GET /api/v1/agents/{agent_id}
async fn get_agent(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, DispatchError> {
    let agent_id = path.into_inner();
    let presence = state
        .presence
        .get(&agent_id)
        .await
        .ok_or_else(|| DispatchError::NotFound(format!("agent {}", agent_id)))?;

    Ok(HttpResponse::Ok().json(presence))
}
