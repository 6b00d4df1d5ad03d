//! Favorites repository for database operations

use sqlx::SqlitePool;

use crate::db::models::FavoriteRow;
use crate::models::{EntryKey, FavoriteEntry};

/// All favorites, most recently added first
pub async fn list(pool: &SqlitePool) -> Result<Vec<FavoriteRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FavoriteRow>(
        r#"
        SELECT stream_id, stream_type, name, stream_icon, category_name, added_at
        FROM favorites
        ORDER BY added_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert a favorite, replacing the display attributes if it already exists
pub async fn upsert(pool: &SqlitePool, entry: &FavoriteEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO favorites (stream_id, stream_type, name, stream_icon, category_name, added_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (stream_id, stream_type) DO UPDATE SET
            name = excluded.name,
            stream_icon = excluded.stream_icon,
            category_name = excluded.category_name,
            added_at = excluded.added_at
        "#,
    )
    .bind(entry.stream_id)
    .bind(entry.stream_type.as_str())
    .bind(&entry.name)
    .bind(&entry.stream_icon)
    .bind(&entry.category_name)
    .bind(entry.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a favorite. Returns the number of rows removed.
pub async fn delete(pool: &SqlitePool, key: EntryKey) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE stream_id = ? AND stream_type = ?")
        .bind(key.stream_id)
        .bind(key.stream_type.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
