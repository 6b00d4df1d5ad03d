//! Watch history repository for database operations
//!
//! One row per (stream_id, stream_type); replaying an item moves it to the
//! front instead of adding a duplicate.

use sqlx::SqlitePool;

use crate::db::models::HistoryRow;
use crate::models::{EntryKey, HistoryEntry};

/// Upsert (insert or update) a single watch history item.
///
/// A known resume point is kept when the new entry does not carry one.
pub async fn upsert_item(pool: &SqlitePool, item: &HistoryEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO watch_history (stream_id, stream_type, name, stream_icon, category_name,
                                   last_position_ms, duration_ms, watched_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (stream_id, stream_type) DO UPDATE SET
            name = excluded.name,
            stream_icon = excluded.stream_icon,
            category_name = excluded.category_name,
            last_position_ms = COALESCE(excluded.last_position_ms, watch_history.last_position_ms),
            duration_ms = COALESCE(excluded.duration_ms, watch_history.duration_ms),
            watched_at = excluded.watched_at
        "#,
    )
    .bind(item.stream_id)
    .bind(item.stream_type.as_str())
    .bind(&item.name)
    .bind(&item.stream_icon)
    .bind(&item.category_name)
    .bind(item.last_position_ms)
    .bind(item.duration_ms)
    .bind(item.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a resume point on every history row of a stream.
/// Returns the number of rows touched.
pub async fn update_progress(
    pool: &SqlitePool,
    stream_id: i64,
    position_ms: i64,
    duration_ms: i64,
    watched_at: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE watch_history
        SET last_position_ms = ?, duration_ms = ?, watched_at = MAX(watched_at, ?)
        WHERE stream_id = ?
        "#,
    )
    .bind(position_ms)
    .bind(duration_ms)
    .bind(watched_at)
    .bind(stream_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Get recent watch history (sorted by most recent first)
pub async fn get_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<HistoryRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT stream_id, stream_type, name, stream_icon, category_name,
               last_position_ms, duration_ms, watched_at
        FROM watch_history
        ORDER BY watched_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a specific watch history item
pub async fn delete_item(pool: &SqlitePool, key: EntryKey) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watch_history WHERE stream_id = ? AND stream_type = ?")
        .bind(key.stream_id)
        .bind(key.stream_type.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete the whole watch history
pub async fn clear(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watch_history")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Cleanup old watch history entries, keeping only the most recent N entries
pub async fn cleanup_old_entries(pool: &SqlitePool, keep_count: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM watch_history
        WHERE rowid NOT IN (
            SELECT rowid FROM watch_history
            ORDER BY watched_at DESC
            LIMIT ?
        )
        "#,
    )
    .bind(keep_count)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::memory_pool;
    use crate::models::StreamType;

    fn entry(stream_id: i64, timestamp: i64) -> HistoryEntry {
        HistoryEntry {
            stream_id,
            name: format!("Movie {}", stream_id),
            stream_icon: None,
            category_name: None,
            stream_type: StreamType::Vod,
            last_position_ms: None,
            duration_ms: None,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_replay_moves_item_to_front() {
        let pool = memory_pool().await;
        upsert_item(&pool, &entry(1, 10)).await.unwrap();
        upsert_item(&pool, &entry(2, 20)).await.unwrap();
        upsert_item(&pool, &entry(1, 30)).await.unwrap();

        let rows = get_recent(&pool, 10).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.stream_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_upsert_keeps_known_position() {
        let pool = memory_pool().await;
        upsert_item(&pool, &entry(5, 10)).await.unwrap();
        update_progress(&pool, 5, 4_000, 9_000, 11).await.unwrap();
        upsert_item(&pool, &entry(5, 12)).await.unwrap();

        let rows = get_recent(&pool, 10).await.unwrap();
        assert_eq!(rows[0].last_position_ms, Some(4_000));
        assert_eq!(rows[0].duration_ms, Some(9_000));
    }

    #[tokio::test]
    async fn test_cleanup_keeps_most_recent() {
        let pool = memory_pool().await;
        for i in 1..=5 {
            upsert_item(&pool, &entry(i, i * 10)).await.unwrap();
        }
        let deleted = cleanup_old_entries(&pool, 2).await.unwrap();
        assert_eq!(deleted, 3);

        let ids: Vec<i64> = get_recent(&pool, 10)
            .await
            .unwrap()
            .iter()
            .map(|r| r.stream_id)
            .collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let pool = memory_pool().await;
        upsert_item(&pool, &entry(1, 10)).await.unwrap();
        upsert_item(&pool, &entry(2, 20)).await.unwrap();
        assert_eq!(delete_item(&pool, entry(1, 0).key()).await.unwrap(), 1);
        assert_eq!(clear(&pool).await.unwrap(), 1);
        assert!(get_recent(&pool, 10).await.unwrap().is_empty());
    }
}
