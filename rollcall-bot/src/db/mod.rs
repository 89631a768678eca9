//! Per-table database queries
//!
//! Thin sqlx wrappers over the schema created by `rollcall_common::db::init`.
//! Inserts are idempotent (`INSERT OR IGNORE`) because callers may retry
//! after a partial failure, e.g. a channel created but the row write lost.

pub mod aliases;
pub mod categories;
pub mod courses;
pub mod enrollments;
pub mod patterns;
pub mod users;
