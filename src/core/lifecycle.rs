use std::sync::Arc;

use crate::core::error::DispatchError;
use crate::core::external::AgentDirectory;
use crate::models::{MatchRequest, RequestStatus};
use crate::store::{PresenceRegistry, RequestStore};

/// The accept/decline/cancel state machine driven by the agent-facing flow
///
/// pending -> offered -> matched, or offered -> back to pending on decline
/// (with the decliner recorded so it is never re-offered). All status writes
/// go through the request store's compare-and-set, so a late accept and a
/// concurrent re-dispatch cannot both win.
pub struct RequestLifecycle {
    presence: Arc<PresenceRegistry>,
    requests: Arc<RequestStore>,
    directory: Arc<dyn AgentDirectory>,
}

impl RequestLifecycle {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        requests: Arc<RequestStore>,
        directory: Arc<dyn AgentDirectory>,
    ) -> Self {
        Self {
            presence,
            requests,
            directory,
        }
    }

    /// Agent accepts the request it was offered
    ///
    /// On success the request is matched for good, the agent's live load is
    /// bumped, and a best-effort match record goes to the document store.
    pub async fn accept(
        &self,
        request_id: &str,
        agent_id: &str,
    ) -> Result<MatchRequest, DispatchError> {
        // The assignee check and the status CAS must be one critical
        // section: a stale-offer reclaim can hand the request to another
        // agent between a separate read and this write.
        let matched = self
            .requests
            .transition_assigned(
                request_id,
                RequestStatus::Offered,
                agent_id,
                RequestStatus::Matched,
            )
            .await?;

        // The match is the authoritative outcome; presence is advisory. If
        // the agent's presence lapsed between offer and accept, the load
        // bump is a logged no-op.
        match self.presence.increment_load(agent_id).await {
            Some(load) => tracing::debug!("Agent {} load is now {}", agent_id, load),
            None => tracing::warn!(
                "Agent {} accepted request {} with no live presence; load not bumped",
                agent_id,
                request_id
            ),
        }

        if let Err(e) = self.directory.record_match(&matched).await {
            tracing::warn!("Failed to record match for request {}: {}", request_id, e);
        }

        tracing::info!("Request {} matched to agent {}", request_id, agent_id);
        Ok(matched)
    }

    /// Agent declines the request it was offered
    ///
    /// The decliner is recorded first (the set only grows, so a lost race
    /// afterwards leaves nothing to undo), then the request returns to the
    /// dispatch pool with its assignment cleared.
    pub async fn decline(
        &self,
        request_id: &str,
        agent_id: &str,
    ) -> Result<MatchRequest, DispatchError> {
        let request = self
            .requests
            .get(request_id)
            .await
            .ok_or_else(|| DispatchError::NotFound(format!("request {}", request_id)))?;

        if request.assigned_agent_id.as_deref() != Some(agent_id) {
            return Err(DispatchError::Forbidden(format!(
                "request {} is not assigned to agent {}",
                request_id, agent_id
            )));
        }
        if request.status != RequestStatus::Offered {
            return Err(DispatchError::StatusConflict(format!(
                "request {} is {}, not open for decline",
                request_id, request.status
            )));
        }

        self.requests.record_decline(request_id, agent_id).await?;
        let pending = self
            .requests
            .transition_assigned(
                request_id,
                RequestStatus::Offered,
                agent_id,
                RequestStatus::Pending,
            )
            .await?;

        tracing::info!("Agent {} declined request {}", agent_id, request_id);
        Ok(pending)
    }

    /// Client abandons an unmatched search
    ///
    /// Applies to pending searches and to searches every capable agent has
    /// declined; an offered or matched request cannot be cancelled.
    pub async fn cancel(&self, request_id: &str) -> Result<MatchRequest, DispatchError> {
        let expired = match self
            .requests
            .transition(request_id, RequestStatus::Pending, RequestStatus::Expired, None)
            .await
        {
            Err(DispatchError::StatusConflict(_)) => {
                self.requests
                    .transition(
                        request_id,
                        RequestStatus::DeclinedExhausted,
                        RequestStatus::Expired,
                        None,
                    )
                    .await?
            }
            other => other?,
        };

        tracing::info!("Request {} cancelled by client", request_id);
        Ok(expired)
    }
}
