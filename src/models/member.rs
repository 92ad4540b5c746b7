use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum BroadcasterType {
    Partner,
    Affiliate,
    #[default]
    #[serde(rename = "")]
    None,
}

impl From<String> for BroadcasterType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "partner" => BroadcasterType::Partner,
            "affiliate" => BroadcasterType::Affiliate,
            _ => BroadcasterType::None,
        }
    }
}

/// A team member's account details.
///
/// `label` is derived once from `display_name` and `login` when the member
/// is built and is what the search index matches against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub avatar_url: String,
    pub offline_image_url: String,
    pub bio: String,
    pub broadcaster_type: BroadcasterType,
    label: String,
}

/// Raw user record as returned by the users endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub broadcaster_type: BroadcasterType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
}

impl Member {
    pub fn new(id: &str, login: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            login: login.to_string(),
            display_name: display_name.to_string(),
            avatar_url: String::new(),
            offline_image_url: String::new(),
            bio: String::new(),
            broadcaster_type: BroadcasterType::None,
            label: derive_label(display_name, login),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl From<UserRecord> for Member {
    fn from(user: UserRecord) -> Self {
        let label = derive_label(&user.display_name, &user.login);
        Self {
            id: user.id,
            login: user.login,
            display_name: user.display_name,
            avatar_url: user.profile_image_url,
            offline_image_url: user.offline_image_url,
            bio: user.description,
            broadcaster_type: user.broadcaster_type,
            label,
        }
    }
}

/// Display name alone when it only differs from the login by case,
/// otherwise `"Display Name (login)"`.
pub fn derive_label(display_name: &str, login: &str) -> String {
    if display_name.to_lowercase() == login {
        display_name.to_string()
    } else {
        format!("{display_name} ({login})")
    }
}
