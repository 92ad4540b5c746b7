use std::sync::Arc;

use crate::auth::AuthContext;
use crate::filter::{self, FilterParams, FilteredMember};
use crate::live_status::{LiveStatusCache, LiveStatusSnapshot};
use crate::roster_cache::{RosterCache, RosterSnapshot, RosterState};
use crate::scheduler::RefreshPolicy;
use crate::source::TeamSource;

/// Both caches plus the upstream they load from. Cheap to clone; clones
/// share the same caches.
#[derive(Clone)]
pub struct Engine {
    source: Arc<dyn TeamSource>,
    rosters: RosterCache,
    live_status: LiveStatusCache,
}

impl Engine {
    pub fn new(source: Arc<dyn TeamSource>, policy: RefreshPolicy) -> Self {
        Self {
            rosters: RosterCache::new(Arc::clone(&source)),
            live_status: LiveStatusCache::new(Arc::clone(&source), policy),
            source,
        }
    }

    pub fn source(&self) -> &Arc<dyn TeamSource> {
        &self.source
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.live_status.policy()
    }

    pub async fn resolve_roster(
        &self,
        team_id: &str,
        auth: &AuthContext,
    ) -> Option<Arc<RosterSnapshot>> {
        self.rosters.resolve(team_id, auth).await
    }

    pub fn roster_state(&self, team_id: &str) -> RosterState {
        self.rosters.state(team_id)
    }

    pub async fn ensure_live_status_fresh(
        &self,
        team_id: &str,
        member_ids: &[String],
        auth: &AuthContext,
    ) -> Arc<LiveStatusSnapshot> {
        self.live_status.ensure_fresh(team_id, member_ids, auth).await
    }

    pub fn current_live_status(&self, team_id: &str) -> Option<Arc<LiveStatusSnapshot>> {
        self.live_status.current(team_id)
    }

    pub fn apply<'a>(
        roster: &'a RosterSnapshot,
        live: Option<&'a LiveStatusSnapshot>,
        params: &FilterParams,
    ) -> Vec<FilteredMember<'a>> {
        filter::apply(roster, live, params)
    }
}
