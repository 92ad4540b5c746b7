use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member's current broadcast. Only live members ever have one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatusEntry {
    #[serde(rename = "user_id")]
    pub member_id: String,
    #[serde(rename = "user_login", default)]
    pub member_login: String,
    pub viewer_count: u32,
    #[serde(default)]
    pub title: String,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "thumbnail_url", default)]
    pub thumbnail_url_template: String,
    #[serde(default)]
    pub game_name: String,
}

impl LiveStatusEntry {
    /// Fill the `{width}`/`{height}` placeholders of the thumbnail template.
    pub fn thumbnail_url(&self, width: u32, height: u32) -> String {
        self.thumbnail_url_template
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }

    /// How long the member has been live as of `now`.
    pub fn uptime(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.started_at).max(chrono::Duration::zero())
    }
}
