use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::Channel;

const MS_PER_DAY: i64 = 86_400_000;

/// Catch-up retention copied from the owning channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveWindow {
    pub enabled: bool,
    pub days: i64,
}

impl ArchiveWindow {
    pub const NONE: ArchiveWindow = ArchiveWindow {
        enabled: false,
        days: 1,
    };

    pub fn for_channel(channel: &Channel) -> Self {
        Self {
            enabled: channel.tv_archive,
            days: channel.archive_days(),
        }
    }
}

/// One program slot on a channel timeline.
///
/// Liveness, progress and catch-up eligibility are computed from `now` on
/// every call; nothing time-dependent is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpgProgram {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub archive: ArchiveWindow,
}

impl EpgProgram {
    /// `now` falls in `[start_time, end_time)`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    /// Elapsed fraction of a live program, 0 otherwise
    pub fn progress(&self, now: DateTime<Utc>) -> f32 {
        if !self.is_live(now) {
            return 0.0;
        }
        let total = (self.end_time - self.start_time).num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        let elapsed = (now - self.start_time).num_milliseconds();
        (elapsed as f32 / total as f32).clamp(0.0, 1.0)
    }

    /// Finished, archived and still inside the retention window
    pub fn is_catchup_available(&self, now: DateTime<Utc>) -> bool {
        if !self.archive.enabled || self.end_time <= self.start_time {
            return false;
        }
        if self.end_time >= now {
            return false;
        }
        let since_end = (now - self.end_time).num_milliseconds();
        since_end <= self.archive.days * MS_PER_DAY
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 20, 15, 0).unwrap()
    }

    fn program(start: DateTime<Utc>, end: DateTime<Utc>, archive: ArchiveWindow) -> EpgProgram {
        EpgProgram {
            title: "Evening News".into(),
            description: None,
            start_time: start,
            end_time: end,
            archive,
        }
    }

    const ONE_DAY: ArchiveWindow = ArchiveWindow {
        enabled: true,
        days: 1,
    };

    #[test]
    fn test_catchup_window_boundaries() {
        let ended_25h = program(
            now() - Duration::hours(26),
            now() - Duration::hours(25),
            ONE_DAY,
        );
        let ended_23h = program(
            now() - Duration::hours(24),
            now() - Duration::hours(23),
            ONE_DAY,
        );
        assert!(!ended_25h.is_catchup_available(now()));
        assert!(ended_23h.is_catchup_available(now()));
    }

    #[test]
    fn test_catchup_requires_archive_flag() {
        let p = program(
            now() - Duration::hours(2),
            now() - Duration::hours(1),
            ArchiveWindow::NONE,
        );
        assert!(!p.is_catchup_available(now()));
    }

    #[test]
    fn test_live_program_is_not_catchup() {
        let p = program(
            now() - Duration::minutes(10),
            now() + Duration::minutes(20),
            ONE_DAY,
        );
        assert!(p.is_live(now()));
        assert!(!p.is_catchup_available(now()));
    }

    #[test]
    fn test_malformed_window_never_catchup() {
        let p = program(now() - Duration::hours(1), now() - Duration::hours(1), ONE_DAY);
        assert!(!p.is_catchup_available(now()));
        assert_eq!(p.progress(now()), 0.0);
    }

    #[test]
    fn test_progress_is_clamped_fraction() {
        let p = program(
            now() - Duration::minutes(15),
            now() + Duration::minutes(45),
            ArchiveWindow::NONE,
        );
        assert!((p.progress(now()) - 0.25).abs() < 1e-6);

        let future = program(
            now() + Duration::minutes(5),
            now() + Duration::minutes(35),
            ArchiveWindow::NONE,
        );
        assert_eq!(future.progress(now()), 0.0);
        assert!(!future.is_live(now()));
    }

    #[test]
    fn test_end_is_exclusive() {
        let p = program(now() - Duration::minutes(30), now(), ArchiveWindow::NONE);
        assert!(!p.is_live(now()));
    }
}
