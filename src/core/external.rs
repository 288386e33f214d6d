use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AgentProfile, MatchRequest};

/// A transient failure talking to an external collaborator
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// Narrow contract onto the durable profile/listing store
///
/// The dispatch core never writes agent profiles or listings; it queries
/// capabilities, decorates winning matches, and drops a best-effort match
/// record. All three may fail transiently and callers degrade rather than
/// abort.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Whether the agent can serve the given category
    ///
    /// A failure here excludes one agent from one scan, nothing more.
    async fn has_capability(&self, agent_id: &str, category: &str)
        -> Result<bool, CollaboratorError>;

    /// Durable profile fields, used only to decorate a match response
    async fn agent_profile(&self, agent_id: &str)
        -> Result<Option<AgentProfile>, CollaboratorError>;

    /// Record an accepted match in the document store
    async fn record_match(&self, request: &MatchRequest) -> Result<(), CollaboratorError>;
}

/// Fire-and-forget push delivery
///
/// Implementations route to the right platform transport internally and
/// swallow failures; a lost notification never rolls back a match.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, profile: &AgentProfile, title: &str, body: &str, data: serde_json::Value);
}
