// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgentPresence, AgentProfile, DispatchWeights, GeoPoint, MatchRequest, RequestStatus,
    ScoredCandidate,
};
pub use requests::{CreateRequestBody, DecisionBody, GoOfflineBody, GoOnlineBody, HeartbeatBody};
pub use responses::{
    CreateRequestResponse, DecisionResponse, DispatchResponse, ErrorResponse, HealthResponse,
    MatchedAgent, OnlineAgentsResponse,
};
