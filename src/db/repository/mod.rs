//! Database repositories
//!
//! Free functions per table taking a `&SqlitePool`, and the
//! [`SqliteSessionRepository`] that exposes them to the session store.

pub mod favorites;
pub mod parental;
pub mod playback;
pub mod watch_history;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::models::PinRow;
use crate::error::StoreError;
use crate::models::{EntryKey, FavoriteEntry, HistoryEntry, PlaybackPosition};
use crate::services::session_store::SessionRepository;

/// SQLite-backed persistence for the session store
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn load_favorites(&self) -> Result<Vec<FavoriteEntry>, StoreError> {
        let rows = favorites::list(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_favorite(&self, entry: &FavoriteEntry) -> Result<(), StoreError> {
        favorites::upsert(&self.pool, entry).await?;
        Ok(())
    }

    async fn delete_favorite(&self, key: EntryKey) -> Result<(), StoreError> {
        favorites::delete(&self.pool, key).await?;
        Ok(())
    }

    async fn load_history(&self, limit: i64) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = watch_history::get_recent(&self.pool, limit).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        watch_history::upsert_item(&self.pool, entry).await?;
        Ok(())
    }

    async fn update_history_progress(&self, position: &PlaybackPosition) -> Result<(), StoreError> {
        watch_history::update_progress(
            &self.pool,
            position.stream_id,
            position.position_ms,
            position.duration_ms,
            position.updated_at,
        )
        .await?;
        Ok(())
    }

    async fn delete_history(&self, key: EntryKey) -> Result<(), StoreError> {
        watch_history::delete_item(&self.pool, key).await?;
        Ok(())
    }

    async fn clear_history(&self) -> Result<(), StoreError> {
        watch_history::clear(&self.pool).await?;
        Ok(())
    }

    async fn prune_history(&self, keep: i64) -> Result<u64, StoreError> {
        Ok(watch_history::cleanup_old_entries(&self.pool, keep).await?)
    }

    async fn load_position(&self, stream_id: i64) -> Result<Option<PlaybackPosition>, StoreError> {
        let row = playback::get_position(&self.pool, stream_id).await?;
        Ok(row.map(Into::into))
    }

    async fn save_position(&self, position: &PlaybackPosition) -> Result<bool, StoreError> {
        Ok(playback::upsert_position(&self.pool, position).await?)
    }

    async fn load_pin(&self) -> Result<Option<PinRow>, StoreError> {
        Ok(parental::get_pin(&self.pool).await?)
    }

    async fn insert_pin(&self, pin: &PinRow) -> Result<bool, StoreError> {
        Ok(parental::insert(&self.pool, pin).await?)
    }

    async fn replace_pin(&self, pin: &PinRow) -> Result<(), StoreError> {
        parental::replace(&self.pool, pin).await?;
        Ok(())
    }
}
