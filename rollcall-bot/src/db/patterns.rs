//! Auto-create pattern table operations

use crate::error::Result;
use sqlx::{Pool, Sqlite};

/// Store an auto-create pattern (no-op if already stored)
pub async fn insert_pattern(db: &Pool<Sqlite>, pattern: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO auto_create_patterns (pattern) VALUES (?)")
        .bind(pattern)
        .execute(db)
        .await?;
    Ok(())
}

/// Remove an auto-create pattern
pub async fn delete_pattern(db: &Pool<Sqlite>, pattern: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM auto_create_patterns WHERE pattern = ?")
        .bind(pattern)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All stored auto-create patterns
pub async fn list_patterns(db: &Pool<Sqlite>) -> Result<Vec<String>> {
    let patterns: Vec<String> =
        sqlx::query_scalar("SELECT pattern FROM auto_create_patterns ORDER BY pattern")
            .fetch_all(db)
            .await?;
    Ok(patterns)
}
