use serde::{Deserialize, Serialize};

/// A team the broadcaster belongs to, as listed for a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcasterTeam {
    pub id: String,
    pub team_name: String,
    pub team_display_name: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamUser {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
}

/// Team metadata plus the bare membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub team_name: String,
    pub team_display_name: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub users: Vec<TeamUser>,
}

impl Team {
    pub fn user_ids(&self) -> Vec<String> {
        self.users.iter().map(|u| u.user_id.clone()).collect()
    }
}

/// Team metadata kept on a resolved roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamInfo {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub thumbnail_url: String,
}

impl From<&Team> for TeamInfo {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.clone(),
            name: team.team_name.clone(),
            display_name: team.team_display_name.clone(),
            thumbnail_url: team.thumbnail_url.clone(),
        }
    }
}
