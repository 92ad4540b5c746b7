use async_trait::async_trait;
use futures_util::future::join_all;

use crate::auth::AuthContext;
use crate::error::FetchError;
use crate::models::{BroadcasterTeam, LiveStatusEntry, Member, Team};

/// Maximum ids the users and streams endpoints accept per call.
pub const MAX_BATCH: usize = 100;

/// Upstream the caches load from. `HelixClient` is the production
/// implementation; tests substitute scripted fakes.
#[async_trait]
pub trait TeamSource: Send + Sync {
    async fn fetch_team(&self, team_id: &str, auth: &AuthContext) -> Result<Team, FetchError>;

    /// Callers must keep `ids` at or below [`MAX_BATCH`].
    async fn fetch_users(
        &self,
        ids: &[String],
        auth: &AuthContext,
    ) -> Result<Vec<Member>, FetchError>;

    /// Callers must keep `ids` at or below [`MAX_BATCH`].
    async fn fetch_streams(
        &self,
        ids: &[String],
        auth: &AuthContext,
    ) -> Result<Vec<LiveStatusEntry>, FetchError>;

    async fn fetch_broadcaster_teams(
        &self,
        channel_id: &str,
        auth: &AuthContext,
    ) -> Result<Vec<BroadcasterTeam>, FetchError>;
}

/// Fetch member details for any number of ids, one call per batch, all
/// batches in flight at once. A failed batch contributes nothing.
pub async fn fetch_members_batched(
    source: &dyn TeamSource,
    ids: &[String],
    auth: &AuthContext,
) -> Vec<Member> {
    let calls = ids
        .chunks(MAX_BATCH)
        .map(|chunk| source.fetch_users(chunk, auth));
    settle("member details", join_all(calls).await)
}

/// Fetch live streams for any number of ids, one call per batch, all
/// batches in flight at once. A failed batch contributes nothing.
pub async fn fetch_streams_batched(
    source: &dyn TeamSource,
    ids: &[String],
    auth: &AuthContext,
) -> Vec<LiveStatusEntry> {
    let calls = ids
        .chunks(MAX_BATCH)
        .map(|chunk| source.fetch_streams(chunk, auth));
    settle("live status", join_all(calls).await)
}

fn settle<T>(what: &str, results: Vec<Result<Vec<T>, FetchError>>) -> Vec<T> {
    let batches = results.len();
    let mut out = Vec::new();
    for (batch, result) in results.into_iter().enumerate() {
        match result {
            Ok(items) => out.extend(items),
            Err(e) => {
                tracing::warn!(
                    batch,
                    batches,
                    code = e.code(),
                    "failed to fetch {what} batch: {e}"
                );
            }
        }
    }
    out
}
