//! Resume point repository

use sqlx::SqlitePool;

use crate::db::models::PositionRow;
use crate::models::PlaybackPosition;

pub async fn get_position(
    pool: &SqlitePool,
    stream_id: i64,
) -> Result<Option<PositionRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, PositionRow>(
        r#"
        SELECT stream_id, position_ms, duration_ms, updated_at
        FROM playback_positions
        WHERE stream_id = ?
        "#,
    )
    .bind(stream_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Store a resume point unless a newer one is already recorded.
///
/// Ordering is by `updated_at` only, so a rewind issued later replaces a
/// larger position. Returns whether the row was written.
pub async fn upsert_position(
    pool: &SqlitePool,
    position: &PlaybackPosition,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO playback_positions (stream_id, position_ms, duration_ms, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (stream_id) DO UPDATE SET
            position_ms = excluded.position_ms,
            duration_ms = excluded.duration_ms,
            updated_at = excluded.updated_at
        WHERE excluded.updated_at >= playback_positions.updated_at
        "#,
    )
    .bind(position.stream_id)
    .bind(position.position_ms)
    .bind(position.duration_ms)
    .bind(position.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
