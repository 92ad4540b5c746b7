use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

use crate::auth::AuthContext;
use crate::error::FetchError;
use crate::models::{Member, Team, TeamInfo};
use crate::search::SearchIndex;
use crate::source::{fetch_members_batched, TeamSource};

/// A team's resolved membership. Immutable once built.
#[derive(Debug)]
pub struct RosterSnapshot {
    pub team_id: String,
    pub team: TeamInfo,
    pub members: Vec<Member>,
    pub fetched_at: DateTime<Utc>,
    index: SearchIndex,
}

impl RosterSnapshot {
    pub fn new(team_id: &str, team: TeamInfo, members: Vec<Member>) -> Self {
        let index = SearchIndex::new(members.iter().map(|m| m.label().to_string()));
        Self {
            team_id: team_id.to_string(),
            team,
            members,
            fetched_at: Utc::now(),
            index,
        }
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    /// Members whose label matches `text`, in roster order, with the
    /// character spans that matched.
    pub fn search(&self, text: &str) -> Vec<(&Member, Vec<Range<usize>>)> {
        self.index
            .search(text)
            .into_iter()
            .filter_map(|hit| {
                self.members
                    .get(hit.position)
                    .map(|member| (member, hit.spans))
            })
            .collect()
    }
}

/// Where a team id stands in the roster cache.
#[derive(Debug, Clone)]
pub enum RosterState {
    NotRequested,
    Pending,
    Ready(Arc<RosterSnapshot>),
    /// The fetch failed; not retried for the life of the process.
    Failed,
}

enum Slot {
    /// Flips to `true` once the slot has been replaced with the outcome.
    Pending(watch::Receiver<bool>),
    Ready(Arc<RosterSnapshot>),
    Failed,
}

/// Memoizes team rosters by team id. Entries are never evicted.
#[derive(Clone)]
pub struct RosterCache {
    source: Arc<dyn TeamSource>,
    entries: Arc<DashMap<String, Slot>>,
}

impl RosterCache {
    pub fn new(source: Arc<dyn TeamSource>) -> Self {
        Self {
            source,
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn state(&self, team_id: &str) -> RosterState {
        match self.entries.get(team_id).as_deref() {
            None => RosterState::NotRequested,
            Some(Slot::Pending(_)) => RosterState::Pending,
            Some(Slot::Ready(snapshot)) => RosterState::Ready(Arc::clone(snapshot)),
            Some(Slot::Failed) => RosterState::Failed,
        }
    }

    /// Resolve a team's roster, fetching it on first request.
    ///
    /// Concurrent callers for the same id share one fetch. The fetch runs
    /// on its own task, so it completes and is cached even if every caller
    /// goes away. `None` is the negative marker for a failed team.
    pub async fn resolve(&self, team_id: &str, auth: &AuthContext) -> Option<Arc<RosterSnapshot>> {
        let mut done = match self.entries.entry(team_id.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(snapshot) => return Some(Arc::clone(snapshot)),
                Slot::Failed => return None,
                Slot::Pending(done) => done.clone(),
            },
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(false);
                entry.insert(Slot::Pending(rx.clone()));
                self.spawn_fetch(team_id.to_string(), auth.clone(), tx);
                rx
            }
        };

        if done.wait_for(|finished| *finished).await.is_err() {
            tracing::error!(team_id, "roster fetch task ended without a result");
            if let Some(mut slot) = self.entries.get_mut(team_id) {
                if matches!(*slot, Slot::Pending(_)) {
                    *slot = Slot::Failed;
                }
            }
        }

        match self.state(team_id) {
            RosterState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    fn spawn_fetch(&self, team_id: String, auth: AuthContext, done: watch::Sender<bool>) {
        let source = Arc::clone(&self.source);
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let slot = match load_roster(source.as_ref(), &team_id, &auth).await {
                Ok(snapshot) => {
                    tracing::info!(
                        team_id = %team_id,
                        members = snapshot.members.len(),
                        "loaded team roster"
                    );
                    Slot::Ready(Arc::new(snapshot))
                }
                Err(e) => {
                    tracing::warn!(
                        team_id = %team_id,
                        code = e.code(),
                        "failed to load team roster: {e}"
                    );
                    Slot::Failed
                }
            };
            entries.insert(team_id, slot);
            let _ = done.send(true);
        });
    }
}

/// Fetch a team and hydrate its members' details.
pub async fn load_roster(
    source: &dyn TeamSource,
    team_id: &str,
    auth: &AuthContext,
) -> Result<RosterSnapshot, FetchError> {
    let team: Team = source.fetch_team(team_id, auth).await?;
    let members = fetch_members_batched(source, &team.user_ids(), auth).await;
    Ok(RosterSnapshot::new(team_id, TeamInfo::from(&team), members))
}
