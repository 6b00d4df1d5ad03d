//! Xtream Codes API Types
//!
//! Wire types for Xtream Codes Player API v2 responses and their conversion
//! into catalog models. Providers are inconsistent about numbers vs strings,
//! so numeric fields go through lenient deserializers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{
    Category, Channel, ContentKind, Episode, Season, SeriesDetail, SeriesItem, SessionInfo,
    VodItem,
};

/// Server and account used for API calls and playback URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XtreamCredentials {
    /// Server base URL (e.g., "http://example.com:8080")
    pub server: String,
    pub username: String,
    pub password: String,
}

impl XtreamCredentials {
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// All three parts present
    pub fn is_complete(&self) -> bool {
        !self.server.trim().is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
    }

    /// Build the player_api.php base URL
    pub fn api_url(&self) -> String {
        format!(
            "{}/player_api.php?username={}&password={}",
            self.server,
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password)
        )
    }

    fn account_path(&self) -> String {
        format!(
            "{}/{}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password)
        )
    }

    /// Build playback URL for live streams
    pub fn live_url(&self, stream_id: i64, extension: &str) -> String {
        format!(
            "{}/live/{}/{}.{}",
            self.server,
            self.account_path(),
            stream_id,
            extension
        )
    }

    /// Build playback URL for VOD
    pub fn vod_url(&self, stream_id: i64, extension: &str) -> String {
        format!(
            "{}/movie/{}/{}.{}",
            self.server,
            self.account_path(),
            stream_id,
            extension
        )
    }

    /// Build playback URL for series episodes
    pub fn series_url(&self, episode_id: i64, extension: &str) -> String {
        format!(
            "{}/series/{}/{}.{}",
            self.server,
            self.account_path(),
            episode_id,
            extension
        )
    }

    /// Build time-shift URL; `start` is formatted as `YYYY-MM-DD:HH-MM`
    pub fn timeshift_url(&self, stream_id: i64, duration_minutes: i64, start: &str) -> String {
        format!(
            "{}/timeshift/{}/{}/{}/{}.ts",
            self.server,
            self.account_path(),
            duration_minutes,
            start,
            stream_id
        )
    }
}

// ============================================================================
// Lenient field decoding
// ============================================================================

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Accepts `12`, `"12"`, `null` or garbage (→ None)
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_i64))
}

/// Accepts strings or numbers, always yielding a string
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Like [`lenient_string`], but `null` or garbage becomes an empty string
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Authentication Response Types
// ============================================================================

/// Main authentication response from player_api.php (no action)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamAuthResponse {
    pub user_info: XtreamUserInfo,
    #[serde(default)]
    pub server_info: Option<XtreamServerInfo>,
}

/// User account information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamUserInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub auth: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub exp_date: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub is_trial: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub max_connections: Option<i64>,
}

impl XtreamUserInfo {
    /// Check if account is active
    pub fn is_active(&self) -> bool {
        self.auth != Some(0) && self.status.eq_ignore_ascii_case("active")
    }
}

/// Server information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamServerInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp_now: Option<i64>,
}

impl XtreamAuthResponse {
    pub fn into_session_info(self) -> SessionInfo {
        SessionInfo {
            username: self.user_info.username,
            status: self.user_info.status,
            expires_at: self.user_info.exp_date,
            max_connections: self.user_info.max_connections.map(|c| c as i32),
            is_trial: self.user_info.is_trial == Some(1),
            timezone: self.server_info.and_then(|s| s.timezone),
        }
    }
}

// ============================================================================
// Category Types
// ============================================================================

/// Category for live, VOD, or series
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamCategory {
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category_name: String,
}

impl XtreamCategory {
    pub fn into_category(self, kind: ContentKind) -> Option<Category> {
        Some(Category {
            category_id: self.category_id?,
            category_name: self.category_name,
            content_kind: kind,
        })
    }
}

// ============================================================================
// Stream Types
// ============================================================================

/// Live stream (channel) information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamLiveStream {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub num: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stream_id: Option<i64>,
    #[serde(default)]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub tv_archive: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub tv_archive_duration: Option<i64>,
}

impl XtreamLiveStream {
    pub fn into_channel(self) -> Option<Channel> {
        Some(Channel {
            stream_id: self.stream_id?,
            name: self.name,
            category_id: self.category_id.unwrap_or_default(),
            num: self.num,
            stream_icon: self.stream_icon.filter(|s| !s.is_empty()),
            tv_archive: self.tv_archive.unwrap_or(0) > 0,
            tv_archive_duration_days: self.tv_archive_duration,
        })
    }
}

/// VOD (movie) stream information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamVodStream {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stream_id: Option<i64>,
    #[serde(default)]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub container_extension: Option<String>,
}

impl XtreamVodStream {
    pub fn into_item(self) -> Option<VodItem> {
        Some(VodItem {
            stream_id: self.stream_id?,
            name: self.name,
            category_id: self.category_id.unwrap_or_default(),
            icon: self.stream_icon.filter(|s| !s.is_empty()),
            container_extension: self.container_extension,
        })
    }
}

/// Series information from get_series
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamSeries {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub series_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_id: Option<String>,
}

impl XtreamSeries {
    pub fn into_item(self) -> Option<SeriesItem> {
        Some(SeriesItem {
            series_id: self.series_id?,
            name: self.name,
            category_id: self.category_id.unwrap_or_default(),
            icon: self.cover.filter(|s| !s.is_empty()),
        })
    }
}

// ============================================================================
// Series Detail Types
// ============================================================================

/// Detailed series information (from get_series_info)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamSeriesInfo {
    #[serde(default)]
    pub info: Option<XtreamSeriesDetails>,
    /// Episodes grouped by season number (key is season number as string)
    #[serde(default)]
    pub episodes: HashMap<String, Vec<XtreamEpisode>>,
}

/// Series metadata details
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamSeriesDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
}

/// Episode information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamEpisode {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub episode_num: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default)]
    pub container_extension: Option<String>,
    #[serde(default)]
    pub info: Option<XtreamEpisodeInfo>,
}

/// Episode metadata
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamEpisodeInfo {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub duration_secs: Option<i64>,
    #[serde(default)]
    pub plot: Option<String>,
}

impl XtreamSeriesInfo {
    /// Group episodes into sorted seasons; episodes without an id are dropped
    pub fn into_detail(self, series_id: i64) -> SeriesDetail {
        let info = self.info.unwrap_or(XtreamSeriesDetails {
            name: None,
            cover: None,
            plot: None,
        });

        let mut seasons: Vec<Season> = self
            .episodes
            .into_iter()
            .filter_map(|(season, episodes)| {
                let season_number: i32 = season.trim().parse().ok()?;
                let mut episodes: Vec<Episode> = episodes
                    .into_iter()
                    .filter_map(|e| {
                        Some(Episode {
                            id: e.id?,
                            episode_num: e.episode_num.unwrap_or(0) as i32,
                            title: e.title,
                            container_extension: e
                                .container_extension
                                .unwrap_or_else(|| "mp4".to_string()),
                            duration_secs: e.info.as_ref().and_then(|i| i.duration_secs),
                            plot: e.info.and_then(|i| i.plot),
                        })
                    })
                    .collect();
                episodes.sort_by_key(|e| e.episode_num);
                Some(Season {
                    season_number,
                    episodes,
                })
            })
            .collect();
        seasons.sort_by_key(|s| s.season_number);

        SeriesDetail {
            series_id,
            name: info.name.unwrap_or_default(),
            cover: info.cover,
            plot: info.plot,
            seasons,
        }
    }
}

// ============================================================================
// EPG Types
// ============================================================================

/// Short EPG entry (from get_short_epg). Title and description are base64.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamEpgEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stop_timestamp: Option<i64>,
}

/// EPG listings container
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamEpgListings {
    #[serde(default)]
    pub epg_listings: Vec<XtreamEpgEntry>,
}
