//! Database models

use crate::ids::{ChannelId, UserId};
use serde::{Deserialize, Serialize};

/// A course: one enrollment unit backed by one text channel
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    /// Normalized course code (`PREFIX-NNN`, or free-text fallback)
    pub code: String,
    /// Backing text channel
    pub channel_id: ChannelId,
    /// Human description from the catalogue, if known
    pub description: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

/// A grouping node channels can be nested under
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Backing category channel
    pub channel_id: ChannelId,
    /// Auto-import pattern; channels whose name matches are moved here
    pub pattern: Option<String>,
    /// Auto-import priority; negative disables auto-import for this category
    pub priority: i64,
    pub created_at: chrono::NaiveDateTime,
}

/// An alternate name redirecting enrollment requests to a target course code
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseAlias {
    pub alias: String,
    pub target: String,
    /// Hidden aliases resolve but are excluded from public listings
    pub hidden: bool,
}

/// A (user, course) membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_code: String,
    pub joined_at: chrono::NaiveDateTime,
}
