use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Live state of an online agent
///
/// A presence record only counts as "online" while its last heartbeat is
/// within the registry's TTL window. Capabilities are not stored here; they
/// are looked up against the listing store at dispatch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPresence {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub location: GeoPoint,
    /// Count of active assignments
    pub load: u32,
    /// Agent rating, 0-5
    pub rating: f64,
    #[serde(rename = "onlineSince")]
    pub online_since: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "lastHeartbeat")]
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

/// Lifecycle status of a client request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Offered,
    Matched,
    DeclinedExhausted,
    Expired,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Offered => "offered",
            RequestStatus::Matched => "matched",
            RequestStatus::DeclinedExhausted => "declined-exhausted",
            RequestStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// One client-initiated search for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub location: GeoPoint,
    /// Requested service category (e.g. Apartment, Hotel, Shortlet)
    pub category: String,
    pub status: RequestStatus,
    #[serde(rename = "assignedAgentId")]
    pub assigned_agent_id: Option<String>,
    /// Agents who refused this request; only ever grows
    #[serde(rename = "declinedBy", default)]
    pub declined_by: BTreeSet<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "offeredAt")]
    pub offered_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "matchedAt")]
    pub matched_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Durable agent profile held by the external document store
///
/// Only read here, to decorate a successful match response and to route
/// push notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "agencyName", default)]
    pub agency_name: Option<String>,
    #[serde(rename = "licenseId", default)]
    pub license_id: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(rename = "expoPushToken", default)]
    pub expo_push_token: Option<String>,
    #[serde(rename = "fcmToken", default)]
    pub fcm_token: Option<String>,
}

/// A candidate agent with its dispatch score attached
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub presence: AgentPresence,
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub score: f64,
}

/// Weights for the dispatch score; lower total score wins
#[derive(Debug, Clone, Copy)]
pub struct DispatchWeights {
    pub eta: f64,
    pub load: f64,
    pub rating: f64,
}

impl Default for DispatchWeights {
    fn default() -> Self {
        Self {
            eta: 0.7,
            load: 0.2,
            rating: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&RequestStatus::DeclinedExhausted).unwrap();
        assert_eq!(json, "\"declined-exhausted\"");

        let back: RequestStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, RequestStatus::Pending);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RequestStatus::Offered.to_string(), "offered");
        assert_eq!(RequestStatus::DeclinedExhausted.to_string(), "declined-exhausted");
    }
}
