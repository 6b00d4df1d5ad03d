//! Database row types for SQLite
//!
//! These map directly to table rows and convert into the session models in
//! `models/session.rs`. Timestamps are stored as epoch milliseconds.

use sqlx::FromRow;
use tracing::warn;

use crate::models::{FavoriteEntry, HistoryEntry, PlaybackPosition, StreamType};

fn parse_stream_type(value: &str) -> StreamType {
    StreamType::parse(value).unwrap_or_else(|| {
        warn!("Unknown stream type '{}' in database, treating as live", value);
        StreamType::Live
    })
}

/// Favorite row from database
#[derive(Debug, Clone, FromRow)]
pub struct FavoriteRow {
    pub stream_id: i64,
    pub stream_type: String,
    pub name: String,
    pub stream_icon: Option<String>,
    pub category_name: Option<String>,
    pub added_at: i64,
}

impl From<FavoriteRow> for FavoriteEntry {
    fn from(row: FavoriteRow) -> Self {
        Self {
            stream_id: row.stream_id,
            stream_type: parse_stream_type(&row.stream_type),
            name: row.name,
            stream_icon: row.stream_icon,
            category_name: row.category_name,
            timestamp: row.added_at,
        }
    }
}

/// Watch history row from database
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub stream_id: i64,
    pub stream_type: String,
    pub name: String,
    pub stream_icon: Option<String>,
    pub category_name: Option<String>,
    pub last_position_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub watched_at: i64,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            stream_id: row.stream_id,
            stream_type: parse_stream_type(&row.stream_type),
            name: row.name,
            stream_icon: row.stream_icon,
            category_name: row.category_name,
            last_position_ms: row.last_position_ms,
            duration_ms: row.duration_ms,
            timestamp: row.watched_at,
        }
    }
}

/// Resume point row from database
#[derive(Debug, Clone, FromRow)]
pub struct PositionRow {
    pub stream_id: i64,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub updated_at: i64,
}

impl From<PositionRow> for PlaybackPosition {
    fn from(row: PositionRow) -> Self {
        Self {
            stream_id: row.stream_id,
            position_ms: row.position_ms,
            duration_ms: row.duration_ms,
            updated_at: row.updated_at,
        }
    }
}

/// Parental PIN record: hex salt and hex HMAC-SHA256 of the PIN
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PinRow {
    pub salt: String,
    pub pin_hash: String,
    pub created_at: i64,
}
