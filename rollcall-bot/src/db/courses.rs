//! Course table operations

use crate::error::Result;
use rollcall_common::db::Course;
use rollcall_common::ChannelId;
use sqlx::{Pool, Sqlite};

/// Check whether a course code is linked
pub async fn course_exists(db: &Pool<Sqlite>, code: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE code = ?)")
        .bind(code)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

/// Look up a course by code
///
/// **Returns:** Some(course) if linked, None if unknown
pub async fn get_course(db: &Pool<Sqlite>, code: &str) -> Result<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT code, channel_id, description, created_at FROM courses WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(db)
    .await?;
    Ok(course)
}

/// Look up the course linked to a channel
pub async fn get_course_by_channel(
    db: &Pool<Sqlite>,
    channel: ChannelId,
) -> Result<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT code, channel_id, description, created_at FROM courses WHERE channel_id = ?",
    )
    .bind(channel)
    .fetch_optional(db)
    .await?;
    Ok(course)
}

/// Link a course code to a channel (no-op if the code is already linked)
pub async fn insert_course(
    db: &Pool<Sqlite>,
    code: &str,
    channel: ChannelId,
    description: Option<&str>,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO courses (code, channel_id, description) VALUES (?, ?, ?)")
        .bind(code)
        .bind(channel)
        .bind(description)
        .execute(db)
        .await?;
    Ok(())
}

/// Unlink a course by code
///
/// **Returns:** true if a row was removed
pub async fn delete_course(db: &Pool<Sqlite>, code: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE code = ?")
        .bind(code)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Unlink whatever course is backed by a channel
///
/// **Returns:** the removed course code, if any
pub async fn delete_course_by_channel(
    db: &Pool<Sqlite>,
    channel: ChannelId,
) -> Result<Option<String>> {
    let code: Option<String> =
        sqlx::query_scalar("DELETE FROM courses WHERE channel_id = ? RETURNING code")
            .bind(channel)
            .fetch_optional(db)
            .await?;
    Ok(code)
}

/// All linked courses, ordered by code
pub async fn list_courses(db: &Pool<Sqlite>) -> Result<Vec<Course>> {
    let courses = sqlx::query_as::<_, Course>(
        "SELECT code, channel_id, description, created_at FROM courses ORDER BY code",
    )
    .fetch_all(db)
    .await?;
    Ok(courses)
}
