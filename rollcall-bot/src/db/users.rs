//! Per-user flag operations

use crate::error::Result;
use rollcall_common::UserId;
use sqlx::{Pool, Sqlite};

/// Check the "disallow course join" flag
pub async fn is_join_blacklisted(db: &Pool<Sqlite>, user: UserId) -> Result<bool> {
    let flagged: Option<bool> =
        sqlx::query_scalar("SELECT join_blacklisted FROM user_flags WHERE user_id = ?")
            .bind(user)
            .fetch_optional(db)
            .await?;
    Ok(flagged.unwrap_or(false))
}

/// Set or clear the "disallow course join" flag
pub async fn set_join_blacklisted(db: &Pool<Sqlite>, user: UserId, flagged: bool) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_flags (user_id, join_blacklisted) VALUES (?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
             join_blacklisted = excluded.join_blacklisted,
             updated_at = CURRENT_TIMESTAMP",
    )
    .bind(user)
    .bind(flagged)
    .execute(db)
    .await?;
    Ok(())
}
