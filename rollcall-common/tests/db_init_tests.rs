//! Tests for database initialization and schema creation

use rollcall_common::db::{create_schema, init_database, init_memory_database};
use std::path::PathBuf;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let test_db = format!("/tmp/rollcall-test-db-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    // Ensure database doesn't exist
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    // Cleanup
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let test_db = format!("/tmp/rollcall-test-db-existing-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Open database second time (should succeed)
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let pool = init_memory_database().await.unwrap();

    // Second pass over an already-created schema must not fail
    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();
}

#[tokio::test]
async fn test_course_delete_cascades_to_enrollments() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO courses (code, channel_id) VALUES ('COMP-102', 42)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO enrollments (user_id, course_code) VALUES (7, 'COMP-102')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM courses WHERE code = 'COMP-102'")
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0, "Enrollment rows should cascade with the course");
}

#[tokio::test]
async fn test_duplicate_course_insert_is_ignored() {
    let pool = init_memory_database().await.unwrap();

    for _ in 0..2 {
        sqlx::query("INSERT OR IGNORE INTO courses (code, channel_id) VALUES ('COMP-102', 42)")
            .execute(&pool)
            .await
            .unwrap();
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
