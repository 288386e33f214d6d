use std::sync::Arc;
use std::time::Duration;

use crate::core::error::DispatchError;
use crate::core::external::{AgentDirectory, Notifier};
use crate::core::scoring::{pick_winner, score_candidate, DEFAULT_AVG_SPEED_KMH};
use crate::models::{
    DispatchWeights, MatchRequest, MatchedAgent, RequestStatus, ScoredCandidate,
};
use crate::store::{PresenceRegistry, RequestStore};

/// How long an unanswered offer stays reserved before a fresh dispatch may
/// reclaim the request
pub const DEFAULT_OFFER_TTL: Duration = Duration::from_secs(30);

/// One dispatch attempt: scan, filter, score, lock
///
/// The engine holds no state of its own beyond configuration; each call is
/// a pure function over a snapshot of the presence registry and the request
/// store, plus the external capability lookup. Correctness under concurrent
/// dispatches rests entirely on the request store's compare-and-set.
pub struct MatchEngine {
    presence: Arc<PresenceRegistry>,
    requests: Arc<RequestStore>,
    directory: Arc<dyn AgentDirectory>,
    notifier: Arc<dyn Notifier>,
    weights: DispatchWeights,
    avg_speed_kmh: f64,
    offer_ttl: Duration,
}

impl MatchEngine {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        requests: Arc<RequestStore>,
        directory: Arc<dyn AgentDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            presence,
            requests,
            directory,
            notifier,
            weights: DispatchWeights::default(),
            avg_speed_kmh: DEFAULT_AVG_SPEED_KMH,
            offer_ttl: DEFAULT_OFFER_TTL,
        }
    }

    pub fn with_scoring(mut self, weights: DispatchWeights, avg_speed_kmh: f64) -> Self {
        self.weights = weights;
        self.avg_speed_kmh = avg_speed_kmh;
        self
    }

    pub fn with_offer_ttl(mut self, offer_ttl: Duration) -> Self {
        self.offer_ttl = offer_ttl;
        self
    }

    /// Find and lock in the best available agent for a request
    ///
    /// Exactly one of several concurrent dispatches for the same request
    /// wins the final compare-and-set; losers observe `AlreadyResolved`
    /// and must not rescan within the same call.
    pub async fn dispatch(
        &self,
        request_id: &str,
    ) -> Result<(MatchRequest, MatchedAgent), DispatchError> {
        let request = self
            .requests
            .get(request_id)
            .await
            .ok_or_else(|| DispatchError::NotFound(format!("request {}", request_id)))?;

        // Normalize to a dispatchable status. A stale offer (the assigned
        // agent never answered within the offer TTL) is reclaimed by a CAS
        // reset, so concurrent reclaims elect one winner here too.
        let request = match request.status {
            RequestStatus::Pending | RequestStatus::DeclinedExhausted => request,
            RequestStatus::Offered => {
                if !self.offer_is_stale(&request) {
                    return Err(DispatchError::AlreadyResolved(request_id.to_string()));
                }
                tracing::info!("Reclaiming stale offer on request {}", request_id);
                self.requests
                    .transition(
                        request_id,
                        RequestStatus::Offered,
                        RequestStatus::Pending,
                        None,
                    )
                    .await
                    .map_err(|_| DispatchError::AlreadyResolved(request_id.to_string()))?
            }
            RequestStatus::Matched | RequestStatus::Expired => {
                return Err(DispatchError::AlreadyResolved(request_id.to_string()));
            }
        };
        let expected = request.status;

        // Stage 1: one consistent snapshot of everyone online
        let snapshot = self.presence.list_online().await;

        // Stage 2: capability and decline filters
        let mut candidates: Vec<ScoredCandidate> = Vec::new();
        let mut capable_but_declined = false;
        for presence in &snapshot {
            match self
                .directory
                .has_capability(&presence.agent_id, &request.category)
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    // Degrade to excluding this one agent, never the scan
                    tracing::warn!(
                        "Capability lookup failed for agent {}: {}; excluding from scan",
                        presence.agent_id,
                        e
                    );
                    continue;
                }
            }
            if request.declined_by.contains(&presence.agent_id) {
                capable_but_declined = true;
                continue;
            }

            // Stage 3: score survivors
            candidates.push(score_candidate(
                request.location,
                presence,
                &self.weights,
                self.avg_speed_kmh,
            ));
        }

        tracing::debug!(
            "Request {}: {} online, {} candidates after filtering",
            request_id,
            snapshot.len(),
            candidates.len()
        );

        let Some(winner) = pick_winner(candidates) else {
            if capable_but_declined && expected != RequestStatus::DeclinedExhausted {
                // Every capable online agent has already declined. The
                // request stays dispatchable so a newly-online agent can
                // still pick it up; ignoring a lost CAS is fine here.
                let _ = self
                    .requests
                    .transition(
                        request_id,
                        expected,
                        RequestStatus::DeclinedExhausted,
                        None,
                    )
                    .await;
            }
            return Err(DispatchError::NoCandidate);
        };

        // Stage 4: lock the winner in. First successful CAS wins; a loss
        // means another dispatch already resolved this request.
        let offered = self
            .requests
            .transition(
                request_id,
                expected,
                RequestStatus::Offered,
                Some(winner.presence.agent_id.clone()),
            )
            .await
            .map_err(|e| match e {
                DispatchError::StatusConflict(_) => {
                    DispatchError::AlreadyResolved(request_id.to_string())
                }
                other => other,
            })?;

        tracing::info!(
            "Request {} offered to agent {} (score {:.3}, {:.2} km)",
            request_id,
            winner.presence.agent_id,
            winner.score,
            winner.distance_km
        );

        // Read-only join with the durable profile; a miss or a transient
        // failure degrades the response, it cannot undo a won CAS.
        let profile = match self.directory.agent_profile(&winner.presence.agent_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    "Profile enrichment failed for agent {}: {}",
                    winner.presence.agent_id,
                    e
                );
                None
            }
        };

        if let Some(profile) = profile.as_ref() {
            let body = format!("New {} request nearby", offered.category);
            let data = serde_json::json!({
                "requestId": offered.request_id,
                "lat": offered.location.lat,
                "lng": offered.location.lng,
                "category": offered.category,
            });
            self.notifier
                .notify(profile, "New client request", &body, data)
                .await;
        }

        let agent = MatchedAgent {
            agent_id: winner.presence.agent_id.clone(),
            name: profile.as_ref().map(|p| p.name.clone()),
            phone: profile.as_ref().and_then(|p| p.phone.clone()),
            email: profile.as_ref().and_then(|p| p.email.clone()),
            agency_name: profile.as_ref().and_then(|p| p.agency_name.clone()),
            verified: profile.as_ref().map(|p| p.verified).unwrap_or(false),
            location: winner.presence.location,
            load: winner.presence.load,
            rating: winner.presence.rating,
            distance_km: winner.distance_km,
            eta_minutes: winner.eta_minutes,
        };

        Ok((offered, agent))
    }

    fn offer_is_stale(&self, request: &MatchRequest) -> bool {
        let Some(offered_at) = request.offered_at else {
            return true;
        };
        let age = chrono::Utc::now().signed_duration_since(offered_at);
        age >= chrono::Duration::from_std(self.offer_ttl).unwrap_or(chrono::Duration::zero())
    }
}
