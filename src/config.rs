use std::time::Duration;

pub const DEFAULT_HELIX_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_REFRESH_BASE_SECS: u64 = 300;
pub const DEFAULT_REFRESH_JITTER_SECS: u64 = 300;

/// Live status refresh timing: every poll lands `base + U[0, jitter]` after
/// the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshConfig {
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(DEFAULT_REFRESH_BASE_SECS),
            jitter: Duration::from_secs(DEFAULT_REFRESH_JITTER_SECS),
        }
    }
}

pub struct Config {
    pub helix_url: String,
    pub client_id: Option<String>,
    pub helix_token: Option<String>,
    pub channel_id: Option<String>,
    pub refresh: RefreshConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let base = std::env::var("TEAM_ROSTER_REFRESH_BASE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_BASE_SECS);
        let jitter = std::env::var("TEAM_ROSTER_REFRESH_JITTER_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_JITTER_SECS);

        Self {
            helix_url: std::env::var("TEAM_ROSTER_HELIX_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_HELIX_URL.to_string()),
            client_id: non_empty_var("TEAM_ROSTER_CLIENT_ID"),
            helix_token: non_empty_var("TEAM_ROSTER_HELIX_TOKEN"),
            channel_id: non_empty_var("TEAM_ROSTER_CHANNEL_ID"),
            refresh: RefreshConfig {
                base: Duration::from_secs(base),
                jitter: Duration::from_secs(jitter),
            },
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("TEAM_ROSTER_HELIX_URL");
        std::env::remove_var("TEAM_ROSTER_CLIENT_ID");
        std::env::remove_var("TEAM_ROSTER_HELIX_TOKEN");
        std::env::remove_var("TEAM_ROSTER_CHANNEL_ID");
        std::env::remove_var("TEAM_ROSTER_REFRESH_BASE_SECS");
        std::env::remove_var("TEAM_ROSTER_REFRESH_JITTER_SECS");
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.helix_url, DEFAULT_HELIX_URL);
        assert!(config.client_id.is_none());
        assert!(config.helix_token.is_none());
        assert!(config.channel_id.is_none());
        assert_eq!(config.refresh, RefreshConfig::default());
    }

    #[test]
    #[serial]
    fn test_helix_url_trailing_slash_trimmed() {
        clear_env();
        std::env::set_var("TEAM_ROSTER_HELIX_URL", "http://localhost:8080/helix/");
        let config = Config::from_env();
        assert_eq!(config.helix_url, "http://localhost:8080/helix");
    }

    #[test]
    #[serial]
    fn test_refresh_from_env() {
        clear_env();
        std::env::set_var("TEAM_ROSTER_REFRESH_BASE_SECS", "60");
        std::env::set_var("TEAM_ROSTER_REFRESH_JITTER_SECS", "0");
        let config = Config::from_env();
        assert_eq!(config.refresh.base, Duration::from_secs(60));
        assert_eq!(config.refresh.jitter, Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_invalid_refresh_falls_back_to_default() {
        clear_env();
        std::env::set_var("TEAM_ROSTER_REFRESH_BASE_SECS", "soon");
        let config = Config::from_env();
        assert_eq!(
            config.refresh.base,
            Duration::from_secs(DEFAULT_REFRESH_BASE_SECS)
        );
    }

    #[test]
    #[serial]
    fn test_blank_credentials_are_ignored() {
        clear_env();
        std::env::set_var("TEAM_ROSTER_CLIENT_ID", "  ");
        std::env::set_var("TEAM_ROSTER_CHANNEL_ID", "12826");
        let config = Config::from_env();
        assert!(config.client_id.is_none());
        assert_eq!(config.channel_id.as_deref(), Some("12826"));
    }
}
