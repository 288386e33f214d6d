use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors surfaced by the presence registry, request store and dispatch
/// engine
///
/// All of these are recoverable by the caller. A `StatusConflict` in
/// particular is a routine outcome under concurrency: it means another
/// caller already acted on the request, not that anything is broken.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("agent {0} is offline; go online before sending heartbeats")]
    NotOnline(String),

    #[error("status conflict: {0}")]
    StatusConflict(String),

    #[error("request {0} was already resolved by another dispatch")]
    AlreadyResolved(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("no eligible online agent")]
    NoCandidate,
}

impl DispatchError {
    /// Short machine-readable token for the JSON error body
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NotFound(_) => "not_found",
            DispatchError::NotOnline(_) => "not_online",
            DispatchError::StatusConflict(_) => "status_conflict",
            DispatchError::AlreadyResolved(_) => "already_resolved",
            DispatchError::Forbidden(_) => "forbidden",
            DispatchError::NoCandidate => "no_candidate",
        }
    }
}

impl ResponseError for DispatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::NotOnline(_) => StatusCode::FORBIDDEN,
            DispatchError::StatusConflict(_) => StatusCode::CONFLICT,
            DispatchError::AlreadyResolved(_) => StatusCode::CONFLICT,
            DispatchError::Forbidden(_) => StatusCode::FORBIDDEN,
            DispatchError::NoCandidate => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
