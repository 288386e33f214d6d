use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::error::DispatchError;
use crate::models::{GeoPoint, MatchRequest, RequestStatus};

/// Default lifetime of an unresolved request
pub const DEFAULT_REQUEST_TTL: Duration = Duration::from_secs(600);

struct RequestEntry {
    request: MatchRequest,
    deadline: Instant,
}

impl RequestEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// The assignment and timestamps follow the target status: `Offered` records
/// the agent and `offered_at`, `Pending` clears the assignment, `Matched`
/// records `matched_at`.
fn apply_status(
    request: &mut MatchRequest,
    new_status: RequestStatus,
    assigned_agent_id: Option<String>,
) {
    request.status = new_status;
    match new_status {
        RequestStatus::Offered => {
            request.assigned_agent_id = assigned_agent_id;
            request.offered_at = Some(chrono::Utc::now());
        }
        RequestStatus::Pending => {
            request.assigned_agent_id = None;
        }
        RequestStatus::Matched => {
            request.matched_at = Some(chrono::Utc::now());
        }
        RequestStatus::DeclinedExhausted | RequestStatus::Expired => {}
    }
}

/// Ephemeral keyed store of client requests
///
/// Status only changes through the compare-and-set primitives `transition`
/// and `transition_assigned`: the write applies only if the current status
/// (and, for the latter, the assigned agent) equals the expected one at the
/// moment of the write. Concurrent dispatches racing on
/// the same request therefore resolve to exactly one winner. The critical
/// section is synchronous under the map lock, so the CAS is atomic as seen
/// by every caller.
///
/// Requests expire lazily: a record past its TTL is absent to readers; the
/// TTL is fixed at creation and is not extended by transitions.
pub struct RequestStore {
    requests: RwLock<BTreeMap<String, RequestEntry>>,
    ttl: Duration,
}

impl RequestStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            requests: RwLock::new(BTreeMap::new()),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_REQUEST_TTL)
    }

    /// Create a new pending request with a fresh unique id
    pub async fn create(&self, client_id: &str, location: GeoPoint, category: &str) -> MatchRequest {
        let request = MatchRequest {
            request_id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            location,
            category: category.to_string(),
            status: RequestStatus::Pending,
            assigned_agent_id: None,
            declined_by: BTreeSet::new(),
            created_at: chrono::Utc::now(),
            offered_at: None,
            matched_at: None,
        };

        self.requests.write().await.insert(
            request.request_id.clone(),
            RequestEntry {
                request: request.clone(),
                deadline: Instant::now() + self.ttl,
            },
        );

        tracing::info!(
            "Created request {} for client {} ({})",
            request.request_id,
            client_id,
            category
        );
        request
    }

    /// Get a live request
    pub async fn get(&self, request_id: &str) -> Option<MatchRequest> {
        let now = Instant::now();
        self.requests
            .read()
            .await
            .get(request_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.request.clone())
    }

    /// Compare-and-set status transition
    ///
    /// Fails with `StatusConflict` if the current status differs from
    /// `expected` at the moment of the write. A matched request can never
    /// go back to offered: matches are final once accepted.
    pub async fn transition(
        &self,
        request_id: &str,
        expected: RequestStatus,
        new_status: RequestStatus,
        assigned_agent_id: Option<String>,
    ) -> Result<MatchRequest, DispatchError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let entry = requests
            .get_mut(request_id)
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| DispatchError::NotFound(format!("request {}", request_id)))?;

        let current = entry.request.status;
        if current != expected {
            return Err(DispatchError::StatusConflict(format!(
                "request {} is {}, expected {}",
                request_id, current, expected
            )));
        }
        if current == RequestStatus::Matched && new_status == RequestStatus::Offered {
            return Err(DispatchError::StatusConflict(format!(
                "request {} is already matched",
                request_id
            )));
        }

        apply_status(&mut entry.request, new_status, assigned_agent_id);

        tracing::debug!(
            "Request {} transitioned {} -> {}",
            request_id,
            current,
            new_status
        );
        Ok(entry.request.clone())
    }

    /// Compare-and-set on status and assignee in one critical section
    ///
    /// The caller must be the currently assigned agent; anyone else gets
    /// `Forbidden` even when the status matches. This guard has to live
    /// inside the lock: a stale-offer reclaim can reassign the request
    /// between a caller's read and its write, and a status-only CAS would
    /// let the original agent's write land on someone else's offer.
    pub async fn transition_assigned(
        &self,
        request_id: &str,
        expected: RequestStatus,
        expected_agent: &str,
        new_status: RequestStatus,
    ) -> Result<MatchRequest, DispatchError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let entry = requests
            .get_mut(request_id)
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| DispatchError::NotFound(format!("request {}", request_id)))?;

        if entry.request.assigned_agent_id.as_deref() != Some(expected_agent) {
            return Err(DispatchError::Forbidden(format!(
                "request {} is not assigned to agent {}",
                request_id, expected_agent
            )));
        }

        let current = entry.request.status;
        if current != expected {
            return Err(DispatchError::StatusConflict(format!(
                "request {} is {}, expected {}",
                request_id, current, expected
            )));
        }

        apply_status(&mut entry.request, new_status, None);

        tracing::debug!(
            "Request {} transitioned {} -> {} by agent {}",
            request_id,
            current,
            new_status,
            expected_agent
        );
        Ok(entry.request.clone())
    }

    /// Idempotently record that an agent refused this request
    ///
    /// Does not touch the status; the declined set only grows.
    pub async fn record_decline(
        &self,
        request_id: &str,
        agent_id: &str,
    ) -> Result<MatchRequest, DispatchError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let entry = requests
            .get_mut(request_id)
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| DispatchError::NotFound(format!("request {}", request_id)))?;

        entry.request.declined_by.insert(agent_id.to_string());
        Ok(entry.request.clone())
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
