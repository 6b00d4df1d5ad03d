use chrono::Duration;
use std::env;

use crate::services::cleanup::CleanupConfig;
use crate::services::epg::EpgConfig;
use crate::services::xtream::{extract_credentials, XtreamCredentials};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Provider account
    pub xtream_server: Option<String>,
    pub xtream_username: Option<String>,
    pub xtream_password: Option<String>,
    /// Alternative to the three fields above: an Xtream-style M3U link
    pub xtream_m3u_url: Option<String>,

    // SQLite
    pub database_url: String,
    pub db_max_connections: u32,

    // Remote fetches
    pub fetch_timeout_ms: u64,

    // Session state
    pub history_limit: usize,
    pub cleanup_interval_secs: u64,

    // Guide window
    pub epg_lookback_hours: i64,
    pub epg_lookahead_hours: i64,

    // Misc
    pub user_agent: String,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Provider account
            xtream_server: non_empty("XTREAM_SERVER"),
            xtream_username: non_empty("XTREAM_USERNAME"),
            xtream_password: non_empty("XTREAM_PASSWORD"),
            xtream_m3u_url: non_empty("XTREAM_M3U_URL"),

            // SQLite
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://ativeplay.db?mode=rwc".to_string()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            // Remote fetches
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .unwrap_or(30_000), // 30 seconds

            // Session state
            history_limit: env::var("HISTORY_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600), // 1 hour

            // Guide window
            epg_lookback_hours: env::var("EPG_LOOKBACK_HOURS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            epg_lookahead_hours: env::var("EPG_LOOKAHEAD_HOURS")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),

            // Misc - Use VLC user agent to avoid IPTV server blocks
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),
        }
    }

    /// Provider credentials: explicit fields first, then the M3U link
    pub fn credentials(&self) -> Option<XtreamCredentials> {
        if let (Some(server), Some(username), Some(password)) = (
            &self.xtream_server,
            &self.xtream_username,
            &self.xtream_password,
        ) {
            return Some(XtreamCredentials::new(server, username, password));
        }
        self.xtream_m3u_url.as_deref().and_then(extract_credentials)
    }

    pub fn epg_config(&self) -> EpgConfig {
        EpgConfig {
            lookback: Duration::hours(self.epg_lookback_hours.max(0)),
            lookahead: Duration::hours(self.epg_lookahead_hours.max(1)),
        }
    }

    pub fn cleanup_config(&self) -> CleanupConfig {
        CleanupConfig {
            interval_secs: self.cleanup_interval_secs,
            history_keep: self.history_limit as i64,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
