use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::auth::AuthContext;
use crate::models::LiveStatusEntry;
use crate::scheduler::RefreshPolicy;
use crate::source::{fetch_streams_batched, TeamSource};

/// Who on a team was live as of one poll.
///
/// A member is live exactly when they have an entry. Snapshots are never
/// mutated; a refresh replaces the whole snapshot.
#[derive(Debug, Clone)]
pub struct LiveStatusSnapshot {
    pub team_id: String,
    pub status_by_member_id: HashMap<String, LiveStatusEntry>,
    pub fetched_at: DateTime<Utc>,
    pub next_refresh_at: Instant,
}

impl LiveStatusSnapshot {
    pub fn new(
        team_id: &str,
        entries: impl IntoIterator<Item = LiveStatusEntry>,
        next_refresh_at: Instant,
    ) -> Self {
        Self {
            team_id: team_id.to_string(),
            status_by_member_id: entries
                .into_iter()
                .map(|entry| (entry.member_id.clone(), entry))
                .collect(),
            fetched_at: Utc::now(),
            next_refresh_at,
        }
    }

    pub fn get(&self, member_id: &str) -> Option<&LiveStatusEntry> {
        self.status_by_member_id.get(member_id)
    }

    pub fn is_live(&self, member_id: &str) -> bool {
        self.status_by_member_id.contains_key(member_id)
    }

    pub fn live_count(&self) -> usize {
        self.status_by_member_id.len()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_refresh_at
    }
}

/// Live status per team id, refreshed no earlier than each snapshot's
/// `next_refresh_at`.
#[derive(Clone)]
pub struct LiveStatusCache {
    source: Arc<dyn TeamSource>,
    policy: RefreshPolicy,
    entries: Arc<DashMap<String, Arc<LiveStatusSnapshot>>>,
}

impl LiveStatusCache {
    pub fn new(source: Arc<dyn TeamSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn current(&self, team_id: &str) -> Option<Arc<LiveStatusSnapshot>> {
        self.entries.get(team_id).map(|s| Arc::clone(s.value()))
    }

    /// Return the cached snapshot while it is fresh, otherwise poll the
    /// members' streams and store the result under `team_id`.
    ///
    /// The poll runs on its own task and lands in the cache even if the
    /// caller is cancelled. Failed batches count as offline for this cycle.
    pub async fn ensure_fresh(
        &self,
        team_id: &str,
        member_ids: &[String],
        auth: &AuthContext,
    ) -> Arc<LiveStatusSnapshot> {
        if let Some(snapshot) = self.current(team_id) {
            if !snapshot.is_due(Instant::now()) {
                tracing::trace!(team_id, "live status still fresh");
                return snapshot;
            }
        }

        let poll = tokio::spawn(refresh(
            Arc::clone(&self.source),
            self.policy,
            Arc::clone(&self.entries),
            team_id.to_string(),
            member_ids.to_vec(),
            auth.clone(),
        ));

        match poll.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(team_id, "live status refresh task failed: {e}");
                Arc::new(LiveStatusSnapshot::new(
                    team_id,
                    Vec::new(),
                    self.policy.next_refresh_at(Instant::now()),
                ))
            }
        }
    }
}

async fn refresh(
    source: Arc<dyn TeamSource>,
    policy: RefreshPolicy,
    entries: Arc<DashMap<String, Arc<LiveStatusSnapshot>>>,
    team_id: String,
    member_ids: Vec<String>,
    auth: AuthContext,
) -> Arc<LiveStatusSnapshot> {
    let streams = fetch_streams_batched(source.as_ref(), &member_ids, &auth).await;
    let snapshot = Arc::new(LiveStatusSnapshot::new(
        &team_id,
        streams,
        policy.next_refresh_at(Instant::now()),
    ));
    tracing::debug!(
        team_id = %team_id,
        live = snapshot.live_count(),
        members = member_ids.len(),
        "refreshed live status"
    );
    entries.insert(team_id, Arc::clone(&snapshot));
    snapshot
}
