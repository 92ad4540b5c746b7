#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use team_roster::auth::AuthContext;
use team_roster::error::FetchError;
use team_roster::models::{BroadcasterTeam, LiveStatusEntry, Member, Team, TeamUser};
use team_roster::source::TeamSource;
use team_roster::view::TeamView;

pub fn auth() -> AuthContext {
    AuthContext {
        channel_id: "1000".to_string(),
        client_id: "test-client".to_string(),
        helix_token: "test-token".to_string(),
    }
}

pub fn live_entry(member_id: &str, viewers: u32) -> LiveStatusEntry {
    LiveStatusEntry {
        member_id: member_id.to_string(),
        member_login: format!("user{member_id}"),
        viewer_count: viewers,
        title: "just chatting".to_string(),
        started_at: Utc::now(),
        thumbnail_url_template: String::new(),
        game_name: "Just Chatting".to_string(),
    }
}

/// Scripted in-memory upstream that counts every call.
#[derive(Default)]
pub struct FakeSource {
    teams: Mutex<HashMap<String, Team>>,
    users: Mutex<HashMap<String, Member>>,
    live: Mutex<HashMap<String, LiveStatusEntry>>,
    broadcaster_teams: Mutex<Vec<BroadcasterTeam>>,
    team_delays: Mutex<HashMap<String, Duration>>,
    failing_teams: Mutex<HashSet<String>>,
    failing_user_ids: Mutex<HashSet<String>>,
    failing_stream_ids: Mutex<HashSet<String>>,
    panicking_teams: Mutex<HashSet<String>>,
    fail_streams: AtomicBool,
    fail_broadcaster_teams: AtomicBool,
    user_batches: Mutex<Vec<usize>>,
    stream_batches: Mutex<Vec<usize>>,
    pub team_calls: AtomicUsize,
    pub user_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub broadcaster_team_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register team `team_id` with the given `(id, login, display_name)`
    /// members.
    pub fn add_team(&self, team_id: &str, members: &[(&str, &str, &str)]) {
        let team = Team {
            id: team_id.to_string(),
            team_name: format!("team{team_id}"),
            team_display_name: format!("Team {team_id}"),
            thumbnail_url: String::new(),
            users: members
                .iter()
                .map(|(id, login, name)| TeamUser {
                    user_id: id.to_string(),
                    user_login: login.to_string(),
                    user_name: name.to_string(),
                })
                .collect(),
        };
        let mut users = self.users.lock().unwrap();
        for (id, login, name) in members {
            users.insert(id.to_string(), Member::new(id, login, name));
        }
        self.teams.lock().unwrap().insert(team_id.to_string(), team);
    }

    /// Register a team with `count` members whose ids are `0..count`.
    pub fn add_large_team(&self, team_id: &str, count: usize) {
        let owned: Vec<(String, String, String)> = (0..count)
            .map(|i| (i.to_string(), format!("user{i}"), format!("User{i}")))
            .collect();
        let members: Vec<(&str, &str, &str)> = owned
            .iter()
            .map(|(id, login, name)| (id.as_str(), login.as_str(), name.as_str()))
            .collect();
        self.add_team(team_id, &members);
    }

    pub fn set_broadcaster_teams(&self, team_ids: &[&str]) {
        *self.broadcaster_teams.lock().unwrap() = team_ids
            .iter()
            .map(|id| BroadcasterTeam {
                id: id.to_string(),
                team_name: format!("team{id}"),
                team_display_name: format!("Team {id}"),
                thumbnail_url: String::new(),
            })
            .collect();
    }

    pub fn set_live(&self, member_id: &str, viewers: u32) {
        self.live
            .lock()
            .unwrap()
            .insert(member_id.to_string(), live_entry(member_id, viewers));
    }

    pub fn set_offline(&self, member_id: &str) {
        self.live.lock().unwrap().remove(member_id);
    }

    pub fn delay_team(&self, team_id: &str, delay: Duration) {
        self.team_delays
            .lock()
            .unwrap()
            .insert(team_id.to_string(), delay);
    }

    pub fn fail_team(&self, team_id: &str) {
        self.failing_teams.lock().unwrap().insert(team_id.to_string());
    }

    /// Fail any user batch that contains `member_id`.
    pub fn fail_users_containing(&self, member_id: &str) {
        self.failing_user_ids
            .lock()
            .unwrap()
            .insert(member_id.to_string());
    }

    /// Fail any stream batch that contains `member_id`.
    pub fn fail_streams_containing(&self, member_id: &str) {
        self.failing_stream_ids
            .lock()
            .unwrap()
            .insert(member_id.to_string());
    }

    /// Make the team fetch for `team_id` panic instead of returning.
    pub fn panic_on_team(&self, team_id: &str) {
        self.panicking_teams
            .lock()
            .unwrap()
            .insert(team_id.to_string());
    }

    pub fn fail_streams(&self, fail: bool) {
        self.fail_streams.store(fail, Ordering::SeqCst);
    }

    pub fn fail_broadcaster_teams(&self, fail: bool) {
        self.fail_broadcaster_teams.store(fail, Ordering::SeqCst);
    }

    pub fn user_batches(&self) -> Vec<usize> {
        self.user_batches.lock().unwrap().clone()
    }

    pub fn stream_batches(&self) -> Vec<usize> {
        self.stream_batches.lock().unwrap().clone()
    }

    pub fn team_calls(&self) -> usize {
        self.team_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TeamSource for FakeSource {
    async fn fetch_team(&self, team_id: &str, _auth: &AuthContext) -> Result<Team, FetchError> {
        self.team_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.team_delays.lock().unwrap().get(team_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking_teams.lock().unwrap().contains(team_id) {
            panic!("team {team_id} fetch blew up");
        }
        if self.failing_teams.lock().unwrap().contains(team_id) {
            return Err(FetchError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }
        self.teams
            .lock()
            .unwrap()
            .get(team_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("team {team_id}")))
    }

    async fn fetch_users(
        &self,
        ids: &[String],
        _auth: &AuthContext,
    ) -> Result<Vec<Member>, FetchError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.user_batches.lock().unwrap().push(ids.len());
        let failing = self.failing_user_ids.lock().unwrap();
        if ids.iter().any(|id| failing.contains(id)) {
            return Err(FetchError::Status {
                status: 503,
                body: "try again".to_string(),
            });
        }
        let users = self.users.lock().unwrap();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn fetch_streams(
        &self,
        ids: &[String],
        _auth: &AuthContext,
    ) -> Result<Vec<LiveStatusEntry>, FetchError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.stream_batches.lock().unwrap().push(ids.len());
        if self.fail_streams.load(Ordering::SeqCst) {
            return Err(FetchError::Malformed("truncated body".to_string()));
        }
        let failing = self.failing_stream_ids.lock().unwrap();
        if ids.iter().any(|id| failing.contains(id)) {
            return Err(FetchError::Status {
                status: 503,
                body: "try again".to_string(),
            });
        }
        drop(failing);
        let live = self.live.lock().unwrap();
        Ok(ids.iter().filter_map(|id| live.get(id).cloned()).collect())
    }

    async fn fetch_broadcaster_teams(
        &self,
        _channel_id: &str,
        _auth: &AuthContext,
    ) -> Result<Vec<BroadcasterTeam>, FetchError> {
        self.broadcaster_team_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_broadcaster_teams.load(Ordering::SeqCst) {
            return Err(FetchError::Unauthorized);
        }
        Ok(self.broadcaster_teams.lock().unwrap().clone())
    }
}

/// Wait until `ready` holds for the view, re-checking on every revision.
pub async fn wait_for_view(view: &TeamView, ready: impl Fn(&TeamView) -> bool) {
    let mut changes = view.subscribe();
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            if ready(view) {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .expect("view never reached the expected state");
}

/// One request seen by the mock Helix server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub client_id: Option<String>,
}

impl SeenRequest {
    /// Values of every `key=value` pair in the query, in order.
    pub fn params(&self, key: &str) -> Vec<String> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .collect()
    }
}

type Seen = Arc<Mutex<Vec<SeenRequest>>>;

/// Minimal Helix stand-in serving canned responses.
pub struct MockHelix {
    pub url: String,
    seen: Seen,
}

impl MockHelix {
    /// Binds a TCP listener on port 0, spawns the server, and returns it.
    pub async fn spawn() -> Self {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/teams", get(teams))
            .route("/teams/channel", get(channel_teams))
            .route("/users", get(users))
            .route("/streams", get(streams))
            .with_state(Arc::clone(&seen));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://127.0.0.1:{}", addr.port()),
            seen,
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

fn record(seen: &Seen, path: &str, query: Option<String>, headers: &HeaderMap) -> SeenRequest {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = SeenRequest {
        path: path.to_string(),
        query: query.unwrap_or_default(),
        authorization: header("authorization"),
        client_id: header("client-id"),
    };
    seen.lock().unwrap().push(request.clone());
    request
}

async fn teams(
    State(seen): State<Seen>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request = record(&seen, "/teams", query, &headers);
    match request.params("id").first().map(String::as_str) {
        Some("7") => Json(json!({
            "data": [{
                "id": "7",
                "team_name": "staff",
                "team_display_name": "Staff",
                "thumbnail_url": "https://example.com/staff.png",
                "users": [
                    { "user_id": "1", "user_login": "ninja", "user_name": "Ninja" },
                    { "user_id": "2", "user_login": "shroud", "user_name": "shroud" }
                ]
            }]
        }))
        .into_response(),
        Some("garbled") => (StatusCode::OK, "{\"data\": [").into_response(),
        Some("expired") => (StatusCode::UNAUTHORIZED, "invalid oauth token").into_response(),
        _ => Json(json!({ "data": [] })).into_response(),
    }
}

async fn channel_teams(
    State(seen): State<Seen>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    record(&seen, "/teams/channel", query, &headers);
    Json(json!({
        "data": [
            { "id": "7", "team_name": "staff", "team_display_name": "Staff" },
            { "id": "8", "team_name": "friends", "team_display_name": "Friends", "thumbnail_url": "" }
        ]
    }))
}

async fn users(
    State(seen): State<Seen>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request = record(&seen, "/users", query, &headers);
    let ids = request.params("id");
    if ids.iter().any(|id| id == "boom") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let data: Vec<_> = ids
        .iter()
        .map(|id| {
            let kind = if id == "1" { "partner" } else { "" };
            json!({
                "id": id,
                "login": format!("user{id}"),
                "display_name": format!("User{id}"),
                "broadcaster_type": kind,
                "description": "",
                "profile_image_url": format!("https://example.com/{id}.png"),
                "offline_image_url": ""
            })
        })
        .collect();
    Json(json!({ "data": data })).into_response()
}

async fn streams(
    State(seen): State<Seen>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request = record(&seen, "/streams", query, &headers);
    let data: Vec<_> = request
        .params("user_id")
        .iter()
        .filter(|id| id.as_str() == "1")
        .map(|id| {
            json!({
                "id": "40627613724",
                "user_id": id,
                "user_login": format!("user{id}"),
                "user_name": format!("User{id}"),
                "game_name": "Just Chatting",
                "type": "live",
                "title": "hello",
                "viewer_count": 1234,
                "started_at": "2024-03-10T15:04:21Z",
                "thumbnail_url": "https://example.com/live-{width}x{height}.jpg"
            })
        })
        .collect();
    Json(json!({ "data": data }))
}
