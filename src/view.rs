use std::ops::Range;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::Serialize;
use tokio::sync::watch;

use crate::auth::{authorized, AuthContext, AuthEvents};
use crate::engine::Engine;
use crate::filter::{self, FilterParams, FilteredMember};
use crate::live_status::LiveStatusSnapshot;
use crate::models::{LiveStatusEntry, Member, TeamInfo};
use crate::roster_cache::RosterSnapshot;
use crate::scheduler::{RefreshScheduler, SubjectToken};

/// Roster state as seen by the view.
#[derive(Debug, Clone)]
pub enum Hydration {
    /// No team selected.
    Idle,
    Loading,
    /// The roster could not be loaded and will not be retried.
    Unavailable,
    Ready(Arc<RosterSnapshot>),
}

/// An owned, display-ready roster row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub member: Member,
    pub spans: Vec<Range<usize>>,
    pub live: Option<LiveStatusEntry>,
}

impl From<FilteredMember<'_>> for RosterRow {
    fn from(row: FilteredMember<'_>) -> Self {
        Self {
            member: row.member.clone(),
            spans: row.spans,
            live: row.live.cloned(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RosterDisplay {
    Idle,
    Loading,
    Unavailable,
    Ready {
        team: TeamInfo,
        /// The rows belong to a previously selected team.
        stale: bool,
        live_count: usize,
        rows: Vec<RosterRow>,
    },
}

/// A consumer of the engine bound to one team at a time.
///
/// Selecting a team resolves its roster, then polls its live status on the
/// refresh schedule until another team is selected or the view is shut
/// down. Results that arrive for a team that is no longer selected still
/// land in the engine's caches but are never shown.
pub struct TeamView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    engine: Engine,
    auth: watch::Receiver<Option<AuthContext>>,
    scheduler: RefreshScheduler,
    subject: ArcSwapOption<String>,
    hydration: ArcSwap<Hydration>,
    live: ArcSwapOption<LiveStatusSnapshot>,
    filter: ArcSwap<FilterParams>,
    revision: watch::Sender<u64>,
}

impl TeamView {
    pub fn new(engine: Engine, auth: &AuthEvents) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(ViewInner {
                engine,
                auth: auth.subscribe(),
                scheduler: RefreshScheduler::new(),
                subject: ArcSwapOption::empty(),
                hydration: ArcSwap::from_pointee(Hydration::Idle),
                live: ArcSwapOption::empty(),
                filter: ArcSwap::from_pointee(FilterParams::default()),
                revision,
            }),
        }
    }

    pub fn team_id(&self) -> Option<String> {
        self.inner.subject.load_full().map(|id| id.to_string())
    }

    /// Switch to another team, or to none. Selecting the current team again
    /// is a no-op.
    pub fn set_team(&self, team_id: Option<&str>) {
        let current = self.inner.subject.load_full();
        if current.as_deref().map(String::as_str) == team_id {
            return;
        }

        match team_id {
            None => {
                self.inner.scheduler.detach();
                self.inner.subject.store(None);
                self.inner.hydration.store(Arc::new(Hydration::Idle));
                self.inner.live.store(None);
                tracing::debug!("team view cleared");
            }
            Some(team_id) => {
                let inner = Arc::clone(&self.inner);
                self.inner.scheduler.attach(team_id, |token| {
                    inner
                        .subject
                        .store(Some(Arc::new(token.team_id().to_string())));
                    if !matches!(**inner.hydration.load(), Hydration::Ready(_)) {
                        inner.hydration.store(Arc::new(Hydration::Loading));
                    }
                    hydrate(inner, token)
                });
            }
        }
        self.inner.bump();
    }

    pub fn hydration(&self) -> Arc<Hydration> {
        self.inner.hydration.load_full()
    }

    pub fn roster(&self) -> Option<Arc<RosterSnapshot>> {
        match &**self.inner.hydration.load() {
            Hydration::Ready(roster) => Some(Arc::clone(roster)),
            _ => None,
        }
    }

    pub fn live_status(&self) -> Option<Arc<LiveStatusSnapshot>> {
        self.inner.live.load_full()
    }

    /// The shown roster belongs to a team other than the selected one.
    pub fn is_stale(&self) -> bool {
        let subject = self.inner.subject.load_full();
        match (&**self.inner.hydration.load(), subject.as_deref()) {
            (Hydration::Ready(roster), Some(team_id)) => roster.team_id != *team_id,
            (Hydration::Ready(_), None) => true,
            _ => false,
        }
    }

    pub fn filter(&self) -> FilterParams {
        FilterParams::clone(&self.inner.filter.load())
    }

    pub fn set_filter(&self, params: FilterParams) {
        self.inner.filter.store(Arc::new(params));
        self.inner.bump();
    }

    /// Filtered rows of the shown roster; empty until a roster is ready.
    pub fn rows(&self) -> Vec<RosterRow> {
        match self.display() {
            RosterDisplay::Ready { rows, .. } => rows,
            _ => Vec::new(),
        }
    }

    /// Roster rows for the current state and filter.
    pub fn display(&self) -> RosterDisplay {
        match &**self.inner.hydration.load() {
            Hydration::Idle => RosterDisplay::Idle,
            Hydration::Loading => RosterDisplay::Loading,
            Hydration::Unavailable => RosterDisplay::Unavailable,
            Hydration::Ready(roster) => {
                let live = self.inner.live.load_full();
                let rows = filter::apply(roster, live.as_deref(), &self.inner.filter.load())
                    .into_iter()
                    .map(RosterRow::from)
                    .collect();
                RosterDisplay::Ready {
                    team: roster.team.clone(),
                    stale: self.is_stale(),
                    live_count: live.as_ref().map_or(0, |s| s.live_count()),
                    rows,
                }
            }
        }
    }

    /// Ticks whenever anything shown by [`TeamView::display`] may have
    /// changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Whether a hydrate-or-poll task is running for the current team.
    pub fn is_polling(&self) -> bool {
        self.inner.scheduler.is_active()
    }

    /// Stop polling. Fetches already in flight still complete into the
    /// engine's caches.
    pub fn shutdown(&self) {
        self.inner.scheduler.detach();
        self.inner.subject.store(None);
    }
}

impl Drop for TeamView {
    fn drop(&mut self) {
        self.inner.scheduler.detach();
    }
}

impl ViewInner {
    /// Apply an update produced under `token`, unless the view has moved
    /// on to another subject since.
    fn apply(&self, token: &SubjectToken, update: impl FnOnce(&Self)) -> bool {
        let applied = self.scheduler.apply_if_current(token, || update(self));
        if applied {
            self.bump();
        }
        applied
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

async fn hydrate(inner: Arc<ViewInner>, token: SubjectToken) {
    let team_id = token.team_id().to_string();
    let mut auth_rx = inner.auth.clone();
    let Some(mut auth) = authorized(&mut auth_rx).await else {
        tracing::warn!(team_id = %team_id, "auth channel closed before authorization");
        return;
    };

    let Some(roster) = inner.engine.resolve_roster(&team_id, &auth).await else {
        inner.apply(&token, |view| {
            view.hydration.store(Arc::new(Hydration::Unavailable));
        });
        return;
    };

    let cached = inner.engine.current_live_status(&team_id);
    let shown = inner.apply(&token, |view| {
        view.hydration
            .store(Arc::new(Hydration::Ready(Arc::clone(&roster))));
        view.live.store(cached);
    });
    if !shown {
        return;
    }
    tracing::debug!(
        team_id = %team_id,
        epoch = token.epoch(),
        members = roster.members.len(),
        "showing team roster"
    );

    let member_ids = roster.member_ids();
    loop {
        let latest = auth_rx.borrow_and_update().clone();
        if let Some(latest) = latest {
            auth = latest;
        }

        let snapshot = inner
            .engine
            .ensure_live_status_fresh(&team_id, &member_ids, &auth)
            .await;
        let next_refresh_at = snapshot.next_refresh_at;
        if !inner.apply(&token, |view| view.live.store(Some(snapshot))) {
            return;
        }
        tokio::time::sleep_until(next_refresh_at).await;
    }
}
