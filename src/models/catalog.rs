use serde::{Deserialize, Serialize};
use std::fmt;

/// The three catalog sections a provider exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Live,
    Vod,
    Series,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Live, ContentKind::Vod, ContentKind::Series];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Live => "live",
            ContentKind::Vod => "vod",
            ContentKind::Series => "series",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-defined grouping of catalog items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
    pub content_kind: ContentKind,
}

/// Live channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub stream_id: i64,
    pub name: String,
    pub category_id: String,
    /// User-facing channel number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_icon: Option<String>,
    pub tv_archive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tv_archive_duration_days: Option<i64>,
}

impl Channel {
    /// Archive retention used for catch-up. Missing or non-positive means one day.
    pub fn archive_days(&self) -> i64 {
        match self.tv_archive_duration_days {
            Some(days) if days > 0 => days,
            _ => 1,
        }
    }
}

/// Movie entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodItem {
    pub stream_id: i64,
    pub name: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_extension: Option<String>,
}

/// Series entry; episodes come from [`SeriesDetail`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesItem {
    pub series_id: i64,
    pub name: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One entry of a category listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogItem {
    Live(Channel),
    Vod(VodItem),
    Series(SeriesItem),
}

impl CatalogItem {
    /// Stream id for live/VOD, series id for series
    pub fn id(&self) -> i64 {
        match self {
            CatalogItem::Live(c) => c.stream_id,
            CatalogItem::Vod(v) => v.stream_id,
            CatalogItem::Series(s) => s.series_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Live(c) => &c.name,
            CatalogItem::Vod(v) => &v.name,
            CatalogItem::Series(s) => &s.name,
        }
    }

    pub fn category_id(&self) -> &str {
        match self {
            CatalogItem::Live(c) => &c.category_id,
            CatalogItem::Vod(v) => &v.category_id,
            CatalogItem::Series(s) => &s.category_id,
        }
    }

    pub fn icon(&self) -> Option<&str> {
        match self {
            CatalogItem::Live(c) => c.stream_icon.as_deref(),
            CatalogItem::Vod(v) => v.icon.as_deref(),
            CatalogItem::Series(s) => s.icon.as_deref(),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            CatalogItem::Live(_) => ContentKind::Live,
            CatalogItem::Vod(_) => ContentKind::Vod,
            CatalogItem::Series(_) => ContentKind::Series,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            CatalogItem::Live(c) => Some(c),
            _ => None,
        }
    }
}

/// Series with its episodes grouped by season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDetail {
    pub series_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// Sorted by season number
    pub seasons: Vec<Season>,
}

impl SeriesDetail {
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: i32,
    /// Sorted by episode number
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    pub episode_num: i32,
    pub title: String,
    pub container_extension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
}

/// Account facts returned by a successful authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub username: String,
    pub status: String,
    /// Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i32>,
    pub is_trial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Program entry as delivered by the provider's short EPG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortEpgEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix milliseconds
    pub start_ms: i64,
    /// Unix milliseconds
    pub end_ms: i64,
}
