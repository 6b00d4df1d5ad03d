//! Parental PIN record (single row)

use sqlx::SqlitePool;

use crate::db::models::PinRow;

pub async fn get_pin(pool: &SqlitePool) -> Result<Option<PinRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, PinRow>(
        "SELECT salt, pin_hash, created_at FROM parental_control WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Store the PIN only if none exists. Returns whether it was stored.
pub async fn insert(pool: &SqlitePool, pin: &PinRow) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO parental_control (id, salt, pin_hash, created_at)
        VALUES (1, ?, ?, ?)
        "#,
    )
    .bind(&pin.salt)
    .bind(&pin.pin_hash)
    .bind(pin.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite the stored PIN
pub async fn replace(pool: &SqlitePool, pin: &PinRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO parental_control (id, salt, pin_hash, created_at)
        VALUES (1, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            salt = excluded.salt,
            pin_hash = excluded.pin_hash,
            created_at = excluded.created_at
        "#,
    )
    .bind(&pin.salt)
    .bind(&pin.pin_hash)
    .bind(pin.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::memory_pool;

    fn row(hash: &str) -> PinRow {
        PinRow {
            salt: "00ff".into(),
            pin_hash: hash.into(),
            created_at: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_only_once() {
        let pool = memory_pool().await;
        assert!(get_pin(&pool).await.unwrap().is_none());
        assert!(insert(&pool, &row("aa")).await.unwrap());
        assert!(!insert(&pool, &row("bb")).await.unwrap());
        assert_eq!(get_pin(&pool).await.unwrap().unwrap().pin_hash, "aa");

        replace(&pool, &row("cc")).await.unwrap();
        assert_eq!(get_pin(&pool).await.unwrap().unwrap().pin_hash, "cc");
    }
}
