use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;

use crate::auth::{authorized, AuthContext, AuthEvents};
use crate::engine::Engine;
use crate::models::BroadcasterTeam;
use crate::view::TeamView;

/// Lists the channel's teams and keeps a [`TeamView`] on the selected one.
pub struct TeamManager {
    engine: Engine,
    auth: watch::Receiver<Option<AuthContext>>,
    teams: ArcSwapOption<Vec<BroadcasterTeam>>,
    view: TeamView,
}

impl TeamManager {
    pub fn new(engine: Engine, auth: &AuthEvents) -> Self {
        Self {
            view: TeamView::new(engine.clone(), auth),
            engine,
            auth: auth.subscribe(),
            teams: ArcSwapOption::empty(),
        }
    }

    /// Load the broadcaster's teams once authorized and select the first.
    ///
    /// A failed lookup is logged and treated as "no teams". Calling this
    /// again after a successful load returns the cached list.
    pub async fn load(&self) -> Arc<Vec<BroadcasterTeam>> {
        if let Some(teams) = self.teams.load_full() {
            return teams;
        }

        let mut auth_rx = self.auth.clone();
        let Some(auth) = authorized(&mut auth_rx).await else {
            return Arc::new(Vec::new());
        };

        let teams = match self
            .engine
            .source()
            .fetch_broadcaster_teams(&auth.channel_id, &auth)
            .await
        {
            Ok(teams) => teams,
            Err(e) => {
                tracing::warn!(
                    channel_id = %auth.channel_id,
                    code = e.code(),
                    "failed to fetch broadcaster teams: {e}"
                );
                Vec::new()
            }
        };
        tracing::info!(channel_id = %auth.channel_id, teams = teams.len(), "loaded broadcaster teams");

        let teams = Arc::new(teams);
        self.teams.store(Some(Arc::clone(&teams)));
        if let Some(first) = teams.first() {
            self.view.set_team(Some(&first.id));
        }
        teams
    }

    /// `None` until [`TeamManager::load`] has finished.
    pub fn teams(&self) -> Option<Arc<Vec<BroadcasterTeam>>> {
        self.teams.load_full()
    }

    pub fn selected(&self) -> Option<BroadcasterTeam> {
        let team_id = self.view.team_id()?;
        let teams = self.teams.load_full()?;
        teams.iter().find(|t| t.id == team_id).cloned()
    }

    /// Switch the view to one of the loaded teams. Empty or unknown ids are
    /// ignored.
    pub fn select(&self, team_id: &str) -> bool {
        if team_id.is_empty() {
            return false;
        }
        let known = self
            .teams
            .load_full()
            .is_some_and(|teams| teams.iter().any(|t| t.id == team_id));
        if !known {
            tracing::debug!(team_id, "ignoring selection of unknown team");
            return false;
        }
        self.view.set_team(Some(team_id));
        true
    }

    pub fn view(&self) -> &TeamView {
        &self.view
    }
}
