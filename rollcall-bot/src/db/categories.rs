//! Category table operations

use crate::error::Result;
use rollcall_common::db::Category;
use rollcall_common::ChannelId;
use sqlx::{Pool, Sqlite};

/// Register a category channel (no-op if already registered)
pub async fn insert_category(db: &Pool<Sqlite>, channel: ChannelId) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO categories (channel_id) VALUES (?)")
        .bind(channel)
        .execute(db)
        .await?;
    Ok(())
}

/// Look up a category by channel
pub async fn get_category(db: &Pool<Sqlite>, channel: ChannelId) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT channel_id, pattern, priority, created_at FROM categories WHERE channel_id = ?",
    )
    .bind(channel)
    .fetch_optional(db)
    .await?;
    Ok(category)
}

/// Set a category's auto-import pattern and priority
///
/// A negative priority disables auto-import for the category.
pub async fn set_auto_import(
    db: &Pool<Sqlite>,
    channel: ChannelId,
    pattern: Option<&str>,
    priority: i64,
) -> Result<bool> {
    let result = sqlx::query("UPDATE categories SET pattern = ?, priority = ? WHERE channel_id = ?")
        .bind(pattern)
        .bind(priority)
        .bind(channel)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a category row
pub async fn delete_category(db: &Pool<Sqlite>, channel: ChannelId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE channel_id = ?")
        .bind(channel)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All categories, ordered by channel id
pub async fn list_categories(db: &Pool<Sqlite>) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT channel_id, pattern, priority, created_at FROM categories ORDER BY channel_id",
    )
    .fetch_all(db)
    .await?;
    Ok(categories)
}

/// Categories eligible for auto-import, highest priority first.
///
/// Ties break by channel id so the scan order is deterministic.
pub async fn list_auto_import(db: &Pool<Sqlite>) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT channel_id, pattern, priority, created_at FROM categories
         WHERE priority >= 0
         ORDER BY priority DESC, channel_id ASC",
    )
    .fetch_all(db)
    .await?;
    Ok(categories)
}
