//! Xtream Codes API Client
//!
//! HTTP client for the Xtream Codes Player API v2, exposed to the core as a
//! [`CatalogApi`].

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::types::*;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CatalogItem, Category, Channel, ContentKind, SeriesDetail, SessionInfo, ShortEpgEntry,
};
use crate::services::remote::CatalogApi;

/// Default request timeout
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const DEFAULT_USER_AGENT: &str = "VLC/3.0.20 LibVLC/3.0.20";

/// Xtream API Client
pub struct XtreamClient {
    http: Client,
    credentials: XtreamCredentials,
    base_url: String,
    user_agent: String,
}

impl XtreamClient {
    /// Create a client with the default timeout and user agent
    pub fn new(server: &str, username: &str, password: &str) -> Result<Self, XtreamError> {
        Self::from_credentials(
            &XtreamCredentials::new(server, username, password),
            DEFAULT_TIMEOUT_MS,
            DEFAULT_USER_AGENT,
        )
    }

    /// Create from credentials struct
    pub fn from_credentials(
        creds: &XtreamCredentials,
        timeout_ms: u64,
        user_agent: &str,
    ) -> Result<Self, XtreamError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .danger_accept_invalid_certs(true) // Many Xtream servers have self-signed certs
            .build()
            .map_err(|e| XtreamError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: creds.api_url(),
            credentials: creds.clone(),
            user_agent: user_agent.to_string(),
        })
    }

    pub fn credentials(&self) -> &XtreamCredentials {
        &self.credentials
    }

    /// Make a GET request with optional action parameter
    async fn get<T: DeserializeOwned>(&self, action: &str) -> Result<T, XtreamError> {
        let url = if action.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}&action={}", self.base_url, action)
        };

        debug!("Xtream API request: {}", action);

        let response = self
            .http
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(XtreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(XtreamError::Http(status.as_u16()));
        }

        let text = response.text().await.map_err(XtreamError::from_reqwest)?;

        // Handle empty responses (some endpoints return empty for no results)
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "[]" || trimmed == "null" || trimmed == "{}" {
            return Err(XtreamError::EmptyResponse);
        }

        serde_json::from_str(trimmed).map_err(|e| {
            error!(
                "Failed to parse Xtream response for action '{}': {}",
                action, e
            );
            debug!("Response text: {}", snippet(trimmed, 500));
            XtreamError::Parse(e.to_string())
        })
    }

    /// List endpoint; an empty body is an empty list
    async fn get_list<T: DeserializeOwned>(&self, action: &str) -> Result<Vec<T>, XtreamError> {
        match self.get(action).await {
            Err(XtreamError::EmptyResponse) => Ok(Vec::new()),
            other => other,
        }
    }

    fn categories_action(kind: ContentKind) -> &'static str {
        match kind {
            ContentKind::Live => "get_live_categories",
            ContentKind::Vod => "get_vod_categories",
            ContentKind::Series => "get_series_categories",
        }
    }

    fn streams_action(kind: ContentKind) -> &'static str {
        match kind {
            ContentKind::Live => "get_live_streams",
            ContentKind::Vod => "get_vod_streams",
            ContentKind::Series => "get_series",
        }
    }
}

/// First `max_chars` characters of a response body, for logging
fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn decode_text(raw: &str) -> String {
    base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// Drops entries whose timestamps are missing or out of range
fn short_epg_entry(entry: XtreamEpgEntry) -> Option<ShortEpgEntry> {
    Some(ShortEpgEntry {
        title: decode_text(&entry.title),
        description: entry.description.as_deref().map(decode_text),
        start_ms: entry.start_timestamp?.checked_mul(1000)?,
        end_ms: entry.stop_timestamp?.checked_mul(1000)?,
    })
}

fn keep_valid<W, T>(raw: Vec<W>, convert: impl Fn(W) -> Option<T>, what: &str) -> Vec<T> {
    let total = raw.len();
    let items: Vec<T> = raw.into_iter().filter_map(convert).collect();
    if items.len() < total {
        warn!(
            dropped = total - items.len(),
            "Dropped {} entries without an id",
            what
        );
    }
    items
}

#[async_trait]
impl CatalogApi for XtreamClient {
    async fn authenticate(&self) -> CatalogResult<SessionInfo> {
        let auth: XtreamAuthResponse = self.get("").await.map_err(|e| match e {
            // Rejected logins come back as HTML or a stub without user_info
            XtreamError::Parse(_) | XtreamError::EmptyResponse => {
                CatalogError::Auth("Invalid credentials".to_string())
            }
            other => other.into(),
        })?;

        if !auth.user_info.is_active() {
            return Err(CatalogError::Auth(format!(
                "Account not active. Status: {}",
                auth.user_info.status
            )));
        }
        Ok(auth.into_session_info())
    }

    async fn fetch_categories(&self, kind: ContentKind) -> CatalogResult<Vec<Category>> {
        let raw: Vec<XtreamCategory> = self.get_list(Self::categories_action(kind)).await?;
        Ok(keep_valid(raw, |c| c.into_category(kind), "categories"))
    }

    async fn fetch_items(
        &self,
        kind: ContentKind,
        category_id: &str,
    ) -> CatalogResult<Vec<CatalogItem>> {
        let action = format!(
            "{}&category_id={}",
            Self::streams_action(kind),
            urlencoding::encode(category_id)
        );
        let items = match kind {
            ContentKind::Live => {
                let raw: Vec<XtreamLiveStream> = self.get_list(&action).await?;
                keep_valid(raw, |s| s.into_channel().map(CatalogItem::Live), "channels")
            }
            ContentKind::Vod => {
                let raw: Vec<XtreamVodStream> = self.get_list(&action).await?;
                keep_valid(raw, |s| s.into_item().map(CatalogItem::Vod), "movies")
            }
            ContentKind::Series => {
                let raw: Vec<XtreamSeries> = self.get_list(&action).await?;
                keep_valid(raw, |s| s.into_item().map(CatalogItem::Series), "series")
            }
        };
        Ok(items)
    }

    async fn fetch_all_channels(&self) -> CatalogResult<Vec<Channel>> {
        let raw: Vec<XtreamLiveStream> = self.get_list("get_live_streams").await?;
        Ok(keep_valid(raw, XtreamLiveStream::into_channel, "channels"))
    }

    async fn fetch_series_detail(&self, series_id: i64) -> CatalogResult<SeriesDetail> {
        let info: XtreamSeriesInfo = self
            .get(&format!("get_series_info&series_id={}", series_id))
            .await
            .map_err(|e| match e {
                XtreamError::EmptyResponse => {
                    CatalogError::NotFound(format!("Series {} not found", series_id))
                }
                other => other.into(),
            })?;
        Ok(info.into_detail(series_id))
    }

    async fn fetch_short_epg(
        &self,
        stream_id: i64,
        limit: Option<u32>,
    ) -> CatalogResult<Vec<ShortEpgEntry>> {
        let mut action = format!("get_short_epg&stream_id={}", stream_id);
        if let Some(l) = limit {
            action.push_str(&format!("&limit={}", l));
        }
        let listings = match self.get::<XtreamEpgListings>(&action).await {
            Ok(listings) => listings.epg_listings,
            Err(XtreamError::EmptyResponse) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(listings
            .into_iter()
            .filter_map(short_epg_entry)
            .collect())
    }
}

/// Xtream API Error types
#[derive(Debug, thiserror::Error)]
pub enum XtreamError {
    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),
    /// Request exceeded the client timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP error (non-2xx status)
    #[error("HTTP error: {0}")]
    Http(u16),
    /// JSON parsing error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Empty response from server
    #[error("Empty response")]
    EmptyResponse,
}

impl XtreamError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            XtreamError::Timeout
        } else if e.is_connect() {
            XtreamError::Network("Connection failed - server unreachable".to_string())
        } else {
            XtreamError::Network(e.to_string())
        }
    }
}

impl From<XtreamError> for CatalogError {
    fn from(err: XtreamError) -> Self {
        match err {
            XtreamError::Network(_) | XtreamError::Timeout => {
                CatalogError::Transport(err.to_string())
            }
            XtreamError::Http(code) => match code {
                401 | 403 => CatalogError::Auth(err.to_string()),
                404 => CatalogError::NotFound(err.to_string()),
                408 | 429 | 500..=599 => CatalogError::Transport(err.to_string()),
                _ => CatalogError::Unknown(err.to_string()),
            },
            XtreamError::Parse(_) | XtreamError::EmptyResponse => {
                CatalogError::Unknown(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_construction() {
        let client = XtreamClient::new("http://example.com:8080", "user", "pass").unwrap();
        assert!(client
            .base_url
            .starts_with("http://example.com:8080/player_api.php"));
        assert!(client.base_url.contains("username=user"));
        assert!(client.base_url.contains("password=pass"));
    }

    #[test]
    fn test_client_url_trailing_slash() {
        let client = XtreamClient::new("http://example.com:8080/", "user", "pass").unwrap();
        // Should not have double slash
        assert!(!client.base_url.contains("//player_api"));
    }

    #[test]
    fn test_error_taxonomy_mapping() {
        assert!(matches!(
            CatalogError::from(XtreamError::Timeout),
            CatalogError::Transport(_)
        ));
        assert!(matches!(
            CatalogError::from(XtreamError::Http(401)),
            CatalogError::Auth(_)
        ));
        assert!(matches!(
            CatalogError::from(XtreamError::Http(404)),
            CatalogError::NotFound(_)
        ));
        assert!(matches!(
            CatalogError::from(XtreamError::Http(503)),
            CatalogError::Transport(_)
        ));
        assert!(matches!(
            CatalogError::from(XtreamError::Parse("x".into())),
            CatalogError::Unknown(_)
        ));
    }

    #[test]
    fn test_decode_text_base64_with_fallback() {
        assert_eq!(decode_text("TmV3cyBhdCBOaW5l"), "News at Nine");
        assert_eq!(decode_text("Plain title!"), "Plain title!");
    }

    #[test]
    fn test_keep_valid_drops_missing_ids() {
        let raw = vec![
            XtreamVodStream {
                name: "A".into(),
                stream_id: Some(1),
                stream_icon: None,
                category_id: Some("2".into()),
                container_extension: None,
            },
            XtreamVodStream {
                name: "B".into(),
                stream_id: None,
                stream_icon: None,
                category_id: None,
                container_extension: None,
            },
        ];
        let items = keep_valid(raw, XtreamVodStream::into_item, "movies");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].stream_id, 1);
    }
    #[test]
    fn test_snippet_respects_char_boundaries() {
        let body = format!("{}é<html>", "a".repeat(499));
        let cut = snippet(&body, 500);
        assert_eq!(cut.chars().count(), 500);
        assert!(cut.ends_with('é'));
        assert_eq!(snippet("short", 500), "short");
    }

    #[test]
    fn test_short_epg_entry_drops_out_of_range_timestamps() {
        let entry = |start: Option<i64>, stop: Option<i64>| XtreamEpgEntry {
            title: "TmV3cw==".into(),
            description: None,
            start_timestamp: start,
            stop_timestamp: stop,
        };
        let ok = short_epg_entry(entry(Some(1_700_000_000), Some(1_700_003_600))).unwrap();
        assert_eq!(ok.title, "News");
        assert_eq!(ok.start_ms, 1_700_000_000_000);

        assert!(short_epg_entry(entry(Some(i64::MAX), Some(1_700_003_600))).is_none());
        assert!(short_epg_entry(entry(Some(1_700_000_000), Some(i64::MIN))).is_none());
        assert!(short_epg_entry(entry(None, Some(1_700_003_600))).is_none());
    }
}
