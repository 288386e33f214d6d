use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::DispatchError;
use crate::models::{
    CreateRequestBody, CreateRequestResponse, DecisionBody, DecisionResponse, DispatchResponse,
    ErrorResponse, GeoPoint,
};
use crate::routes::AppState;

/// Configure all request/dispatch routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/requests", web::post().to(create_request))
        .route("/requests/{request_id}", web::get().to(get_request))
        .route("/requests/{request_id}", web::delete().to(cancel_request))
        .route("/requests/{request_id}/dispatch", web::post().to(dispatch))
        .route("/requests/{request_id}/accept", web::post().to(accept))
        .route("/requests/{request_id}/decline", web::post().to(decline));
}

/// Client creates a new search for an agent
///
/// POST /api/v1/requests
///
/// Request body:
/// ```json
/// {
///   "clientId": "string",
///   "lat": 6.5244,
///   "lng": 3.3792,
///   "category": "Hotel"
/// }
/// ```
async fn create_request(
    state: web::Data<AppState>,
    body: web::Json<CreateRequestBody>,
) -> Result<HttpResponse, DispatchError> {
    if let Err(errors) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        }));
    }

    let request = state
        .requests
        .create(&body.client_id, GeoPoint::new(body.lat, body.lng), &body.category)
        .await;

    Ok(HttpResponse::Created().json(CreateRequestResponse {
        message: "Client request created".to_string(),
        request_id: request.request_id,
        status: request.status,
    }))
}

/// Fetch a live request
///
/// GET /api/v1/requests/{request_id}
async fn get_request(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, DispatchError> {
    let request_id = path.into_inner();
    let request = state
        .requests
        .get(&request_id)
        .await
        .ok_or_else(|| DispatchError::NotFound(format!("request {}", request_id)))?;

    Ok(HttpResponse::Ok().json(request))
}

/// One attempt to find and lock in an agent for a request
///
/// POST /api/v1/requests/{request_id}/dispatch
///
/// Called on request creation and on client-initiated retries. Exactly one
/// of several concurrent calls for the same request wins; losers get 409.
async fn dispatch(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, DispatchError> {
    let request_id = path.into_inner();
    let (request, agent) = state.engine.dispatch(&request_id).await?;

    Ok(HttpResponse::Ok().json(DispatchResponse {
        message: "Agent matched successfully".to_string(),
        request,
        agent,
    }))
}

/// Agent accepts the request it was offered
///
/// POST /api/v1/requests/{request_id}/accept
async fn accept(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DecisionBody>,
) -> Result<HttpResponse, DispatchError> {
    if let Err(errors) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        }));
    }

    let request_id = path.into_inner();
    let matched = state.lifecycle.accept(&request_id, &body.agent_id).await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: "Request accepted successfully".to_string(),
        request_id: matched.request_id,
        status: matched.status,
    }))
}

/// Agent declines the request it was offered
///
/// POST /api/v1/requests/{request_id}/decline
async fn decline(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DecisionBody>,
) -> Result<HttpResponse, DispatchError> {
    if let Err(errors) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        }));
    }

    let request_id = path.into_inner();
    let pending = state.lifecycle.decline(&request_id, &body.agent_id).await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: "Request declined successfully".to_string(),
        request_id: pending.request_id,
        status: pending.status,
    }))
}

/// Client abandons a pending search
///
/// DELETE /api/v1/requests/{request_id}
async fn cancel_request(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, DispatchError> {
    let request_id = path.into_inner();
    let expired = state.lifecycle.cancel(&request_id).await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: "Request cancelled".to_string(),
        request_id: expired.request_id,
        status: expired.status,
    }))
}
