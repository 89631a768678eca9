//! Enrollment table operations

use crate::error::Result;
use rollcall_common::db::Enrollment;
use rollcall_common::UserId;
use sqlx::{Pool, Sqlite};

/// Check membership of a (user, course) pair
pub async fn is_enrolled(db: &Pool<Sqlite>, user: UserId, code: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = ? AND course_code = ?)",
    )
    .bind(user)
    .bind(code)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Insert a membership row (no-op if already present)
pub async fn insert_enrollment(db: &Pool<Sqlite>, user: UserId, code: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO enrollments (user_id, course_code) VALUES (?, ?)")
        .bind(user)
        .bind(code)
        .execute(db)
        .await?;
    Ok(())
}

/// Delete a membership row
///
/// **Returns:** true if a row was removed
pub async fn delete_enrollment(db: &Pool<Sqlite>, user: UserId, code: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM enrollments WHERE user_id = ? AND course_code = ?")
        .bind(user)
        .bind(code)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All members of a course
pub async fn course_members(db: &Pool<Sqlite>, code: &str) -> Result<Vec<UserId>> {
    let members: Vec<UserId> =
        sqlx::query_scalar("SELECT user_id FROM enrollments WHERE course_code = ? ORDER BY user_id")
            .bind(code)
            .fetch_all(db)
            .await?;
    Ok(members)
}

/// All course codes a user belongs to
pub async fn user_courses(db: &Pool<Sqlite>, user: UserId) -> Result<Vec<String>> {
    let codes: Vec<String> =
        sqlx::query_scalar("SELECT course_code FROM enrollments WHERE user_id = ? ORDER BY course_code")
            .bind(user)
            .fetch_all(db)
            .await?;
    Ok(codes)
}

/// Full enrollment rows for a user (admin API)
pub async fn user_enrollments(db: &Pool<Sqlite>, user: UserId) -> Result<Vec<Enrollment>> {
    let rows = sqlx::query_as::<_, Enrollment>(
        "SELECT user_id, course_code, joined_at FROM enrollments WHERE user_id = ? ORDER BY course_code",
    )
    .bind(user)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
