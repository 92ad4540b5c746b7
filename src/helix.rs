use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::auth::AuthContext;
use crate::error::FetchError;
use crate::models::member::UserRecord;
use crate::models::{BroadcasterTeam, DataResponse, LiveStatusEntry, Member, Team};
use crate::source::TeamSource;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Helix API client using extension frontend authentication.
#[derive(Clone)]
pub struct HelixClient {
    client: Client,
    base_url: String,
}

impl HelixClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn apply_auth(
        &self,
        builder: reqwest::RequestBuilder,
        auth: &AuthContext,
    ) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("Extension {}", auth.helix_token))
            .header("Client-ID", &auth.client_id)
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        auth: &AuthContext,
    ) -> Result<Vec<T>, FetchError> {
        let url = format!("{}{path}", self.base_url);
        let builder = self.client.get(&url).query(query).timeout(REQUEST_TIMEOUT);
        let resp = self.apply_auth(builder, auth).send().await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = resp.bytes().await?;
        let envelope: DataResponse<T> = serde_json::from_slice(&body)?;
        Ok(envelope.data)
    }
}

fn repeated<'a>(key: &'a str, ids: &'a [String]) -> Vec<(&'a str, &'a str)> {
    ids.iter().map(|id| (key, id.as_str())).collect()
}

#[async_trait]
impl TeamSource for HelixClient {
    async fn fetch_team(&self, team_id: &str, auth: &AuthContext) -> Result<Team, FetchError> {
        self.get_data::<Team>("/teams", &[("id", team_id)], auth)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(format!("team {team_id}")))
    }

    async fn fetch_users(
        &self,
        ids: &[String],
        auth: &AuthContext,
    ) -> Result<Vec<Member>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = self
            .get_data::<UserRecord>("/users", &repeated("id", ids), auth)
            .await?;
        Ok(users.into_iter().map(Member::from).collect())
    }

    async fn fetch_streams(
        &self,
        ids: &[String],
        auth: &AuthContext,
    ) -> Result<Vec<LiveStatusEntry>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_data("/streams", &repeated("user_id", ids), auth)
            .await
    }

    async fn fetch_broadcaster_teams(
        &self,
        channel_id: &str,
        auth: &AuthContext,
    ) -> Result<Vec<BroadcasterTeam>, FetchError> {
        self.get_data("/teams/channel", &[("broadcaster_id", channel_id)], auth)
            .await
    }
}
