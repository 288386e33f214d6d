use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::core::error::DispatchError;
use crate::models::{AgentPresence, GeoPoint};

/// Default heartbeat TTL; a presence with no heartbeat for this long is gone
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(60);

struct PresenceEntry {
    presence: AgentPresence,
    deadline: Instant,
}

impl PresenceEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// Ephemeral keyed store of live agent state
///
/// Expiry is enforced at read time: a record whose TTL lapsed is invisible
/// to `get` and `list_online` even while it physically remains in the map
/// (it is overwritten by the next go-online). There is no background sweep
/// and no explicit "offline but present" state.
///
/// All operations take the map lock for a synchronous critical section
/// only, so mutation is atomic per agent key and concurrent heartbeats for
/// the same agent resolve last-write-wins by arrival order.
pub struct PresenceRegistry {
    agents: RwLock<BTreeMap<String, PresenceEntry>>,
    ttl: Duration,
}

impl PresenceRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            agents: RwLock::new(BTreeMap::new()),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_PRESENCE_TTL)
    }

    /// Create or overwrite a presence and start (or refresh) its TTL
    ///
    /// Refreshing a still-live presence keeps its original `online_since`.
    pub async fn set_online(
        &self,
        agent_id: &str,
        location: GeoPoint,
        load: u32,
        rating: f64,
    ) -> AgentPresence {
        let now = Instant::now();
        let wall_now = chrono::Utc::now();

        let mut agents = self.agents.write().await;
        let online_since = agents
            .get(agent_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.presence.online_since)
            .unwrap_or(wall_now);

        let presence = AgentPresence {
            agent_id: agent_id.to_string(),
            location,
            load,
            rating,
            online_since,
            last_heartbeat: wall_now,
        };

        agents.insert(
            agent_id.to_string(),
            PresenceEntry {
                presence: presence.clone(),
                deadline: now + self.ttl,
            },
        );

        tracing::info!("Agent {} is online (load={}, rating={})", agent_id, load, rating);
        presence
    }

    /// Apply a heartbeat to an existing live presence
    ///
    /// An agent must go online explicitly first: a heartbeat for an absent
    /// or expired presence is rejected with `NotOnline` instead of silently
    /// creating state.
    pub async fn heartbeat(
        &self,
        agent_id: &str,
        location: GeoPoint,
        load: u32,
        rating: f64,
    ) -> Result<AgentPresence, DispatchError> {
        let now = Instant::now();
        let mut agents = self.agents.write().await;

        let entry = agents
            .get_mut(agent_id)
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| DispatchError::NotOnline(agent_id.to_string()))?;

        entry.presence.location = location;
        entry.presence.load = load;
        entry.presence.rating = rating;
        entry.presence.last_heartbeat = chrono::Utc::now();
        entry.deadline = now + self.ttl;

        Ok(entry.presence.clone())
    }

    /// Remove a presence immediately, no grace period
    pub async fn set_offline(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().await.remove(agent_id).is_some();
        if removed {
            tracing::info!("Agent {} is offline", agent_id);
        }
        removed
    }

    /// Get a single live presence
    pub async fn get(&self, agent_id: &str) -> Option<AgentPresence> {
        let now = Instant::now();
        self.agents
            .read()
            .await
            .get(agent_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.presence.clone())
    }

    /// Snapshot of every live presence
    ///
    /// Iteration order is the lexicographic agent-id order of the map, so
    /// scans over the snapshot are deterministic.
    pub async fn list_online(&self) -> Vec<AgentPresence> {
        let now = Instant::now();
        self.agents
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.presence.clone())
            .collect()
    }

    /// Atomically bump the load counter of a live presence
    ///
    /// Returns the new load, or `None` when the presence is absent or
    /// expired (callers treat that as a logged no-op, not a failure).
    pub async fn increment_load(&self, agent_id: &str) -> Option<u32> {
        let now = Instant::now();
        let mut agents = self.agents.write().await;

        let entry = agents.get_mut(agent_id).filter(|entry| entry.is_live(now))?;
        entry.presence.load += 1;
        Some(entry.presence.load)
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
