//! Playback URL construction and channel-number resolution.
//!
//! Both are pure: they never touch the network and answer `None` instead of
//! failing loudly, since a bad play intent must not crash the player screen.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Channel, StreamType};
use crate::services::xtream::XtreamCredentials;

const LIVE_EXTENSION: &str = "ts";
const VOD_EXTENSION: &str = "mp4";

/// Time-shift window of a catch-up request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whole minutes needed to cover the range, rounded up
    pub fn duration_minutes(&self) -> i64 {
        let ms = (self.end - self.start).num_milliseconds();
        (ms + 59_999) / 60_000
    }
}

/// What to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub stream_type: StreamType,
    /// Stream id, or episode id for series
    pub stream_id: i64,
    /// Container extension for VOD/series; ignored for live and catch-up
    pub extension: Option<String>,
    /// Required for catch-up, ignored otherwise
    pub range: Option<TimeRange>,
}

impl StreamRequest {
    pub fn live(stream_id: i64) -> Self {
        Self {
            stream_type: StreamType::Live,
            stream_id,
            extension: None,
            range: None,
        }
    }

    pub fn vod(stream_id: i64, extension: Option<&str>) -> Self {
        Self {
            stream_type: StreamType::Vod,
            stream_id,
            extension: extension.map(str::to_string),
            range: None,
        }
    }

    pub fn episode(episode_id: i64, extension: Option<&str>) -> Self {
        Self {
            stream_type: StreamType::Series,
            stream_id: episode_id,
            extension: extension.map(str::to_string),
            range: None,
        }
    }

    pub fn catchup(stream_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            stream_type: StreamType::Catchup,
            stream_id,
            extension: None,
            range: Some(TimeRange::new(start, end)),
        }
    }
}

/// Build the playable URL for `request`.
///
/// `None` when the id is not positive, credentials are incomplete, or a
/// catch-up request lacks a non-empty time range.
pub fn build_stream_url(creds: &XtreamCredentials, request: &StreamRequest) -> Option<String> {
    if request.stream_id <= 0 {
        debug!(stream_id = request.stream_id, "Refusing URL for invalid stream id");
        return None;
    }
    if !creds.is_complete() {
        debug!("Refusing URL without complete credentials");
        return None;
    }

    let extension = request
        .extension
        .as_deref()
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .unwrap_or(VOD_EXTENSION);

    match request.stream_type {
        StreamType::Live => Some(creds.live_url(request.stream_id, LIVE_EXTENSION)),
        StreamType::Vod => Some(creds.vod_url(request.stream_id, extension)),
        StreamType::Series => Some(creds.series_url(request.stream_id, extension)),
        StreamType::Catchup => {
            let range = request.range?;
            if range.start >= range.end {
                debug!(stream_id = request.stream_id, "Refusing catch-up with empty range");
                return None;
            }
            let start = range.start.format("%Y-%m-%d:%H-%M").to_string();
            Some(creds.timeshift_url(request.stream_id, range.duration_minutes(), &start))
        }
    }
}

/// Resolve an on-screen channel number.
///
/// A channel declaring `num == number` wins; otherwise `number` is taken as a
/// 1-based position in `channels`.
pub fn find_channel_by_number(channels: &[Channel], number: i64) -> Option<&Channel> {
    if let Some(channel) = channels.iter().find(|c| c.num == Some(number)) {
        return Some(channel);
    }
    if number < 1 {
        return None;
    }
    channels.get((number - 1) as usize)
}
