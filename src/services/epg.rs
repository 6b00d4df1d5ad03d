//! Program guide synthesis and time navigation.
//!
//! Providers rarely ship a usable guide, so each channel gets a placeholder
//! timeline: contiguous slots of 30/60/90/120 minutes starting at the
//! half-hour boundary before `now - lookback`. Slot layout is seeded by the
//! channel id and the window start, so the same window always yields the same
//! timeline.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{ArchiveWindow, Channel, EpgProgram, ShortEpgEntry};

/// Allowed synthesized slot lengths
pub const SLOT_MINUTES: [i64; 4] = [30, 60, 90, 120];

/// Step used by guide time navigation
pub const NAV_STEP_MINUTES: i64 = 30;

const PLACEHOLDER_TITLES: [&str; 12] = [
    "Morning Briefing",
    "World News",
    "Documentary Hour",
    "Feature Film",
    "Live Sports",
    "Talk Show",
    "Music Session",
    "Kids Zone",
    "Weather Update",
    "Drama Series",
    "Travel Stories",
    "Late Night",
];

/// `:00` when minute < 30, else `:30`; seconds and below zeroed
pub fn round_to_half_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let minute = if t.minute() < 30 { 0 } else { 30 };
    t.with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

#[derive(Debug, Clone, Copy)]
pub struct EpgConfig {
    pub lookback: Duration,
    pub lookahead: Duration,
}

impl Default for EpgConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(2),
            lookahead: Duration::hours(6),
        }
    }
}

/// Builds placeholder timelines for live channels
#[derive(Debug, Clone, Default)]
pub struct EpgSynthesizer {
    config: EpgConfig,
}

impl EpgSynthesizer {
    pub fn new(config: EpgConfig) -> Self {
        Self { config }
    }

    /// First slot start for a guide generated at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        round_to_half_hour(now - self.config.lookback)
    }

    /// Contiguous program list covering `[window_start, now + lookahead]`
    pub fn timeline(&self, channel: &Channel, now: DateTime<Utc>) -> Vec<EpgProgram> {
        let start = self.window_start(now);
        let end = now + self.config.lookahead;
        let archive = ArchiveWindow::for_channel(channel);
        let mut rng = StdRng::seed_from_u64(timeline_seed(channel.stream_id, start));

        let mut programs = Vec::new();
        let mut slot_start = start;
        while slot_start < end {
            let minutes = SLOT_MINUTES[rng.gen_range(0..SLOT_MINUTES.len())];
            let slot_end = slot_start + Duration::minutes(minutes);
            let title = PLACEHOLDER_TITLES[rng.gen_range(0..PLACEHOLDER_TITLES.len())];

            programs.push(EpgProgram {
                title: title.to_string(),
                description: Some(format!("{} on {}", title, channel.name)),
                start_time: slot_start,
                end_time: slot_end,
                archive,
            });
            slot_start = slot_end;
        }
        programs
    }

    /// Timelines for every channel, keyed by stream id
    pub fn synthesize(
        &self,
        channels: &[Channel],
        now: DateTime<Utc>,
    ) -> HashMap<i64, Vec<EpgProgram>> {
        let guide: HashMap<i64, Vec<EpgProgram>> = channels
            .iter()
            .map(|c| (c.stream_id, self.timeline(c, now)))
            .collect();
        debug!(channels = guide.len(), "Synthesized EPG");
        guide
    }
}

fn timeline_seed(stream_id: i64, window_start: DateTime<Utc>) -> u64 {
    (stream_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ window_start.timestamp() as u64
}

/// Convert provider short-EPG entries for `channel`, skipping malformed ones
pub fn programs_from_short_epg(channel: &Channel, entries: &[ShortEpgEntry]) -> Vec<EpgProgram> {
    let archive = ArchiveWindow::for_channel(channel);
    let mut programs: Vec<EpgProgram> = entries
        .iter()
        .filter_map(|entry| {
            let start = DateTime::from_timestamp_millis(entry.start_ms)?;
            let end = DateTime::from_timestamp_millis(entry.end_ms)?;
            if end <= start {
                warn!(
                    stream_id = channel.stream_id,
                    title = %entry.title,
                    "Skipping EPG entry with empty time range"
                );
                return None;
            }
            Some(EpgProgram {
                title: entry.title.clone(),
                description: entry.description.clone(),
                start_time: start,
                end_time: end,
                archive,
            })
        })
        .collect();
    programs.sort_by_key(|p| p.start_time);
    programs
}

/// Guide view: channels, their timelines and the selected time slot.
///
/// Category filtering only narrows the channel list; timelines are never
/// rebuilt for it.
#[derive(Debug, Clone)]
pub struct EpgGuide {
    channels: Vec<Channel>,
    programs: HashMap<i64, Vec<EpgProgram>>,
    selected_slot: DateTime<Utc>,
}

impl EpgGuide {
    pub fn build(synth: &EpgSynthesizer, channels: Vec<Channel>, now: DateTime<Utc>) -> Self {
        let programs = synth.synthesize(&channels, now);
        Self {
            channels,
            programs,
            selected_slot: round_to_half_hour(now),
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel to timeline map
    pub fn programs(&self) -> &HashMap<i64, Vec<EpgProgram>> {
        &self.programs
    }

    pub fn programs_for(&self, stream_id: i64) -> &[EpgProgram] {
        self.programs
            .get(&stream_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Channels in `category_id`, or all channels for `None`
    pub fn visible_channels(&self, category_id: Option<&str>) -> Vec<&Channel> {
        self.channels
            .iter()
            .filter(|c| category_id.map_or(true, |id| c.category_id == id))
            .collect()
    }

    pub fn selected_slot(&self) -> DateTime<Utc> {
        self.selected_slot
    }

    pub fn shift_forward(&mut self) -> DateTime<Utc> {
        self.selected_slot += Duration::minutes(NAV_STEP_MINUTES);
        self.selected_slot
    }

    pub fn shift_backward(&mut self) -> DateTime<Utc> {
        self.selected_slot -= Duration::minutes(NAV_STEP_MINUTES);
        self.selected_slot
    }

    pub fn reset_to_now(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.selected_slot = round_to_half_hour(now);
        self.selected_slot
    }

    /// Program airing at `instant` on a channel
    pub fn program_at(&self, stream_id: i64, instant: DateTime<Utc>) -> Option<&EpgProgram> {
        self.programs_for(stream_id)
            .iter()
            .find(|p| p.start_time <= instant && instant < p.end_time)
    }

    pub fn current_program(&self, stream_id: i64, now: DateTime<Utc>) -> Option<&EpgProgram> {
        self.programs_for(stream_id).iter().find(|p| p.is_live(now))
    }

    /// Per visible channel, the program airing in the selected slot
    pub fn slot_view(&self, category_id: Option<&str>) -> Vec<(&Channel, Option<&EpgProgram>)> {
        self.visible_channels(category_id)
            .into_iter()
            .map(|c| (c, self.program_at(c.stream_id, self.selected_slot)))
            .collect()
    }

    /// Finished programs still replayable on a channel
    pub fn catchup_programs(&self, stream_id: i64, now: DateTime<Utc>) -> Vec<&EpgProgram> {
        self.programs_for(stream_id)
            .iter()
            .filter(|p| p.is_catchup_available(now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn channel(stream_id: i64, category_id: &str, archive: bool) -> Channel {
        Channel {
            stream_id,
            name: format!("Ch {}", stream_id),
            category_id: category_id.to_string(),
            num: None,
            stream_icon: None,
            tv_archive: archive,
            tv_archive_duration_days: Some(1),
        }
    }

    #[test]
    fn test_round_to_half_hour() {
        assert_eq!(round_to_half_hour(at(14, 29, 59)), at(14, 0, 0));
        assert_eq!(round_to_half_hour(at(14, 30, 0)), at(14, 30, 0));
        assert_eq!(round_to_half_hour(at(14, 59, 12)), at(14, 30, 0));
        assert_eq!(round_to_half_hour(at(14, 0, 0)), at(14, 0, 0));
    }

    #[test]
    fn test_round_to_half_hour_zeroes_subseconds() {
        let t = at(9, 45, 10) + Duration::milliseconds(731);
        assert_eq!(round_to_half_hour(t), at(9, 30, 0));
    }

    #[test]
    fn test_timeline_is_contiguous_and_covers_window() {
        let synth = EpgSynthesizer::default();
        let now = at(20, 10, 0);
        let programs = synth.timeline(&channel(5, "1", true), now);

        assert!(!programs.is_empty());
        assert_eq!(programs[0].start_time, at(18, 0, 0));
        for pair in programs.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        for p in &programs {
            assert!(p.start_time < p.end_time);
            assert!(SLOT_MINUTES.contains(&p.duration_minutes()));
        }
        assert!(programs.last().unwrap().end_time >= now + Duration::hours(6));
        assert_eq!(programs.iter().filter(|p| p.is_live(now)).count(), 1);
    }

    #[test]
    fn test_timeline_is_deterministic() {
        let synth = EpgSynthesizer::default();
        let ch = channel(42, "1", false);
        let a = synth.timeline(&ch, at(20, 10, 0));
        let b = synth.timeline(&ch, at(20, 12, 30));
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_catchup_without_archive() {
        let synth = EpgSynthesizer::default();
        let now = at(20, 10, 0);
        let programs = synth.timeline(&channel(9, "1", false), now);
        assert!(programs.iter().all(|p| !p.is_catchup_available(now)));
    }

    #[test]
    fn test_finished_programs_catchup_with_archive() {
        let synth = EpgSynthesizer::default();
        let now = at(20, 10, 0);
        let programs = synth.timeline(&channel(9, "1", true), now);
        for p in &programs {
            assert_eq!(p.is_catchup_available(now), p.end_time < now);
        }
    }

    #[test]
    fn test_guide_navigation() {
        let synth = EpgSynthesizer::default();
        let now = at(20, 40, 0);
        let mut guide = EpgGuide::build(&synth, vec![channel(1, "1", false)], now);

        assert_eq!(guide.selected_slot(), at(20, 30, 0));
        assert_eq!(guide.shift_forward(), at(21, 0, 0));
        assert_eq!(guide.shift_forward(), at(21, 30, 0));
        assert_eq!(guide.shift_backward(), at(21, 0, 0));
        assert_eq!(guide.reset_to_now(at(22, 17, 5)), at(22, 0, 0));
    }

    #[test]
    fn test_category_filter_reuses_programs() {
        let synth = EpgSynthesizer::default();
        let now = at(12, 0, 0);
        let guide = EpgGuide::build(
            &synth,
            vec![channel(1, "news", false), channel(2, "sport", false), channel(3, "news", false)],
            now,
        );

        let news = guide.visible_channels(Some("news"));
        assert_eq!(news.iter().map(|c| c.stream_id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(guide.visible_channels(None).len(), 3);

        let view = guide.slot_view(Some("sport"));
        assert_eq!(view.len(), 1);
        let program = view[0].1.expect("slot covered by timeline");
        assert!(program.start_time <= now && now < program.end_time);
        assert_eq!(guide.current_program(2, now), Some(program));
        assert!(guide.programs_for(99).is_empty());
    }

    #[test]
    fn test_short_epg_skips_malformed_entries() {
        let ch = channel(1, "1", true);
        let entries = vec![
            ShortEpgEntry {
                title: "Later".into(),
                description: None,
                start_ms: 2_000_000,
                end_ms: 3_000_000,
            },
            ShortEpgEntry {
                title: "Broken".into(),
                description: None,
                start_ms: 5_000_000,
                end_ms: 5_000_000,
            },
            ShortEpgEntry {
                title: "Earlier".into(),
                description: Some("first".into()),
                start_ms: 1_000_000,
                end_ms: 2_000_000,
            },
        ];
        let programs = programs_from_short_epg(&ch, &entries);
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].title, "Earlier");
        assert!(programs[0].archive.enabled);
    }
}
