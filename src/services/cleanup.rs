//! Cleanup service for watch history
//!
//! Runs as a background task on startup, then periodically, trimming the
//! history table to the most recent N entries. The session store already
//! prunes after each write; this catches rows written by other processes
//! sharing the same database file.

use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::services::session_store::SessionRepository;

/// Configuration for the cleanup service
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
    /// Maximum watch history items to keep
    pub history_keep: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600, // Run every hour
            history_keep: 100,
        }
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    pub watch_history_deleted: u64,
    pub errors: Vec<String>,
}

impl CleanupResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run a single cleanup cycle
pub async fn run_cleanup(repo: &dyn SessionRepository, config: &CleanupConfig) -> CleanupResult {
    let mut result = CleanupResult::default();

    match repo.prune_history(config.history_keep).await {
        Ok(count) => {
            result.watch_history_deleted = count;
            if count > 0 {
                tracing::info!("Cleanup: deleted {} old watch history entries", count);
            }
        }
        Err(e) => {
            result.errors.push(format!("Watch history cleanup failed: {}", e));
            tracing::error!("Cleanup: watch history cleanup failed: {}", e);
        }
    }

    result
}

/// Start the background cleanup task
///
/// Runs immediately on startup, then periodically at the configured interval
/// until `shutdown` is cancelled. Spawn it with `tokio::spawn`.
pub async fn start_cleanup_task(
    repo: Arc<dyn SessionRepository>,
    config: CleanupConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(
        "Starting cleanup task (interval: {}s, keep_history: {})",
        config.interval_secs,
        config.history_keep
    );

    let mut interval = time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Cleanup task stopped");
                return;
            }
            // The first tick completes immediately
            _ = interval.tick() => {
                let result = run_cleanup(repo.as_ref(), &config).await;
                if !result.is_success() {
                    for error in &result.errors {
                        tracing::warn!("Cleanup error: {}", error);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::memory_pool;
    use crate::db::SqliteSessionRepository;
    use crate::models::{HistoryEntry, StreamType};

    async fn seeded_repo(count: i64) -> SqliteSessionRepository {
        let repo = SqliteSessionRepository::new(memory_pool().await);
        for id in 1..=count {
            let entry = HistoryEntry {
                stream_id: id,
                name: format!("Item {}", id),
                stream_icon: None,
                category_name: None,
                stream_type: StreamType::Live,
                last_position_ms: None,
                duration_ms: None,
                timestamp: id * 1_000,
            };
            repo.upsert_history(&entry).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_run_cleanup_trims_history() {
        let repo = seeded_repo(6).await;
        let config = CleanupConfig {
            interval_secs: 60,
            history_keep: 4,
        };
        let result = run_cleanup(&repo, &config).await;
        assert!(result.is_success());
        assert_eq!(result.watch_history_deleted, 2);
        assert_eq!(repo.load_history(100).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let repo = seeded_repo(3).await;
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(start_cleanup_task(
            Arc::new(repo.clone()),
            CleanupConfig {
                interval_secs: 3600,
                history_keep: 1,
            },
            shutdown.clone(),
        ));

        // Initial run happens right away
        for _ in 0..50 {
            if repo.load_history(100).await.unwrap().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(repo.load_history(100).await.unwrap().len(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }
}
