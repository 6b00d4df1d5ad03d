use serde::{Deserialize, Serialize};
use std::fmt;

use super::catalog::ContentKind;

/// Playable stream flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Live,
    Vod,
    Series,
    /// Time-shifted replay of a finished live program
    Catchup,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Live => "live",
            StreamType::Vod => "vod",
            StreamType::Series => "series",
            StreamType::Catchup => "catchup",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "live" => Some(StreamType::Live),
            "vod" | "movie" => Some(StreamType::Vod),
            "series" => Some(StreamType::Series),
            "catchup" | "timeshift" => Some(StreamType::Catchup),
            _ => None,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ContentKind> for StreamType {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Live => StreamType::Live,
            ContentKind::Vod => StreamType::Vod,
            ContentKind::Series => StreamType::Series,
        }
    }
}

/// Identity of a favorite or history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub stream_id: i64,
    pub stream_type: StreamType,
}

/// Display attributes captured when an item is favorited or played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryAttrs {
    pub name: String,
    pub stream_type: StreamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

impl EntryAttrs {
    pub fn new(name: impl Into<String>, stream_type: StreamType) -> Self {
        Self {
            name: name.into(),
            stream_type,
            stream_icon: None,
            category_name: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.stream_icon = Some(icon.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_name = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub stream_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub stream_type: StreamType,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl FavoriteEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            stream_id: self.stream_id,
            stream_type: self.stream_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub stream_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub stream_type: StreamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Milliseconds since epoch of the last playback event
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            stream_id: self.stream_id,
            stream_type: self.stream_type,
        }
    }

    /// Fraction watched in [0, 1], if the duration is known
    pub fn watched_fraction(&self) -> Option<f64> {
        let duration = self.duration_ms.filter(|d| *d > 0)?;
        let position = self.last_position_ms.unwrap_or(0);
        Some((position as f64 / duration as f64).clamp(0.0, 1.0))
    }
}

/// Stored resume point for one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPosition {
    pub stream_id: i64,
    pub position_ms: i64,
    pub duration_ms: i64,
    /// Issue time of the write that produced this value (ms since epoch)
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_type_round_trip_names() {
        for t in [StreamType::Live, StreamType::Vod, StreamType::Series, StreamType::Catchup] {
            assert_eq!(StreamType::parse(t.as_str()), Some(t));
        }
        assert_eq!(StreamType::parse("movie"), Some(StreamType::Vod));
        assert_eq!(StreamType::parse("radio"), None);
    }

    #[test]
    fn test_watched_fraction() {
        let mut entry = HistoryEntry {
            stream_id: 1,
            name: "Ep".into(),
            stream_icon: None,
            category_name: None,
            stream_type: StreamType::Series,
            last_position_ms: Some(2_500),
            duration_ms: Some(10_000),
            timestamp: 0,
        };
        assert_eq!(entry.watched_fraction(), Some(0.25));
        entry.duration_ms = Some(0);
        assert_eq!(entry.watched_fraction(), None);
    }
}
