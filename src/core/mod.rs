// Core dispatch logic exports
pub mod engine;
pub mod error;
pub mod external;
pub mod geo;
pub mod lifecycle;
pub mod scoring;

pub use engine::{MatchEngine, DEFAULT_OFFER_TTL};
pub use error::DispatchError;
pub use external::{AgentDirectory, CollaboratorError, Notifier};
pub use geo::haversine_distance;
pub use lifecycle::RequestLifecycle;
pub use scoring::{eta_minutes, pick_winner, score_candidate, DEFAULT_AVG_SPEED_KMH};
