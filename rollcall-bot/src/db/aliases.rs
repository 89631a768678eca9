//! Course alias table operations

use crate::error::Result;
use rollcall_common::db::CourseAlias;
use sqlx::{Pool, Sqlite};

/// Create or update an alias pointing at a target course code
pub async fn upsert_alias(
    db: &Pool<Sqlite>,
    alias: &str,
    target: &str,
    hidden: bool,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO course_aliases (alias, target, hidden) VALUES (?, ?, ?)
         ON CONFLICT(alias) DO UPDATE SET target = excluded.target, hidden = excluded.hidden",
    )
    .bind(alias)
    .bind(target)
    .bind(hidden)
    .execute(db)
    .await?;
    Ok(())
}

/// Resolve an alias; hidden aliases still resolve
pub async fn get_alias(db: &Pool<Sqlite>, alias: &str) -> Result<Option<CourseAlias>> {
    let row = sqlx::query_as::<_, CourseAlias>(
        "SELECT alias, target, hidden FROM course_aliases WHERE alias = ?",
    )
    .bind(alias)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Remove an alias
pub async fn delete_alias(db: &Pool<Sqlite>, alias: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM course_aliases WHERE alias = ?")
        .bind(alias)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// List aliases; hidden ones are excluded unless requested
pub async fn list_aliases(db: &Pool<Sqlite>, include_hidden: bool) -> Result<Vec<CourseAlias>> {
    let rows = if include_hidden {
        sqlx::query_as::<_, CourseAlias>(
            "SELECT alias, target, hidden FROM course_aliases ORDER BY alias",
        )
        .fetch_all(db)
        .await?
    } else {
        sqlx::query_as::<_, CourseAlias>(
            "SELECT alias, target, hidden FROM course_aliases WHERE hidden = 0 ORDER BY alias",
        )
        .fetch_all(db)
        .await?
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_common::db::init_memory_database;

    #[tokio::test]
    async fn test_alias_resolves() {
        let pool = init_memory_database().await.unwrap();

        upsert_alias(&pool, "intro", "COMP-102", false).await.unwrap();
        let alias = get_alias(&pool, "intro").await.unwrap().unwrap();
        assert_eq!(alias.target, "COMP-102");
    }

    #[tokio::test]
    async fn test_upsert_replaces_target() {
        let pool = init_memory_database().await.unwrap();

        upsert_alias(&pool, "intro", "COMP-102", false).await.unwrap();
        upsert_alias(&pool, "intro", "COMP-103", true).await.unwrap();

        let alias = get_alias(&pool, "intro").await.unwrap().unwrap();
        assert_eq!(alias.target, "COMP-103");
        assert!(alias.hidden);
    }

    #[tokio::test]
    async fn test_hidden_aliases_resolve_but_do_not_list() {
        let pool = init_memory_database().await.unwrap();

        upsert_alias(&pool, "visible", "COMP-102", false).await.unwrap();
        upsert_alias(&pool, "secret", "COMP-102", true).await.unwrap();

        assert!(get_alias(&pool, "secret").await.unwrap().is_some());

        let public = list_aliases(&pool, false).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].alias, "visible");

        let all = list_aliases(&pool, true).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
