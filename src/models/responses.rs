use crate::models::domain::{AgentPresence, GeoPoint, MatchRequest, RequestStatus};
use serde::{Deserialize, Serialize};

/// Response when a request is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestResponse {
    pub message: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub status: RequestStatus,
}

/// The winning agent of a dispatch, presence joined with profile fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedAgent {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "agencyName")]
    pub agency_name: Option<String>,
    pub verified: bool,
    pub location: GeoPoint,
    pub load: u32,
    pub rating: f64,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "etaMinutes")]
    pub eta_minutes: f64,
}

/// Response for a successful dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub message: String,
    pub request: MatchRequest,
    pub agent: MatchedAgent,
}

/// Response for accept/decline/cancel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub message: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub status: RequestStatus,
}

/// Response listing online agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineAgentsResponse {
    pub agents: Vec<AgentPresence>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
