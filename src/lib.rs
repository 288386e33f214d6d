//! Agent Dispatch - real-time agent matching service
//!
//! This library matches client service requests to the best available field
//! agent using live location, workload and rating signals held in an
//! ephemeral presence registry, with a compare-and-set request lifecycle
//! that guarantees at most one active match per request under concurrency.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use core::{haversine_distance, DispatchError, MatchEngine, RequestLifecycle};
pub use models::{AgentPresence, DispatchWeights, GeoPoint, MatchRequest, RequestStatus};
pub use store::{PresenceRegistry, RequestStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let d = haversine_distance(6.5244, 3.3792, 6.5244, 3.3792);
        assert_eq!(d, 0.0);
    }
}
