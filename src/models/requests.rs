use serde::{Deserialize, Serialize};
use validator::Validate;

/// Client creates a new search for an agent
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequestBody {
    #[validate(length(min = 1))]
    #[serde(alias = "client_id", rename = "clientId")]
    pub client_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(length(min = 1))]
    pub category: String,
}

/// Agent goes online with its initial state
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GoOnlineBody {
    #[validate(length(min = 1))]
    #[serde(alias = "agent_id", rename = "agentId")]
    pub agent_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[serde(default)]
    pub load: u32,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(default = "default_rating")]
    pub rating: f64,
}

fn default_rating() -> f64 {
    5.0
}

/// Periodic location/workload update from an online agent
///
/// `load` and `rating` are required here, unlike at go-online: the update is
/// last-write-wins, and defaulting an omitted field would silently reset
/// state the server has since changed (an accept bumps the live load).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HeartbeatBody {
    #[validate(length(min = 1))]
    #[serde(alias = "agent_id", rename = "agentId")]
    pub agent_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub load: u32,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: f64,
}

/// Agent goes offline explicitly
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GoOfflineBody {
    #[validate(length(min = 1))]
    #[serde(alias = "agent_id", rename = "agentId")]
    pub agent_id: String,
}

/// Agent accepts or declines an offered request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecisionBody {
    #[validate(length(min = 1))]
    #[serde(alias = "agent_id", rename = "agentId")]
    pub agent_id: String,
}
