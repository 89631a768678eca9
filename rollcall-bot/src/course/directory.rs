//! Course directory service
//!
//! Owns the durable course/category/alias/pattern rows and the channel-side
//! effects of linking and unlinking courses. Multi-step operations are not
//! transactional across the gateway and the database; every insert is
//! idempotent so a retry after a partial failure converges.

use super::catalogue::CatalogueCache;
use super::normalize;
use super::organizer;
use crate::db::{aliases, categories, courses, patterns};
use crate::error::{Error, Result};
use crate::gateway::{GuildChannel, GuildDirectory};
use regex::Regex;
use rollcall_common::db::{Category, Course, CourseAlias};
use rollcall_common::ChannelId;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

/// Directory of linked courses and their grouping rules
#[derive(Clone)]
pub struct CourseDirectory {
    db: Pool<Sqlite>,
    guild: Arc<dyn GuildDirectory>,
}

impl CourseDirectory {
    pub fn new(db: Pool<Sqlite>, guild: Arc<dyn GuildDirectory>) -> Self {
        Self { db, guild }
    }

    /// Normalize a raw course token, resolving channel mentions
    pub async fn normalize(&self, raw: &str) -> String {
        normalize::normalize(raw, self.guild.as_ref()).await
    }

    pub async fn course_exists(&self, code: &str) -> Result<bool> {
        courses::course_exists(&self.db, code).await
    }

    pub async fn get_course(&self, code: &str) -> Result<Option<Course>> {
        courses::get_course(&self.db, code).await
    }

    pub async fn get_course_by_channel(&self, channel: ChannelId) -> Result<Option<Course>> {
        courses::get_course_by_channel(&self.db, channel).await
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        courses::list_courses(&self.db).await
    }

    /// Create a course backed by a fresh text channel.
    ///
    /// The new channel is named after the lowercased code and run through the
    /// category organizer. If the code is already linked the existing course
    /// is returned unchanged.
    pub async fn create_course(&self, name: &str, description: Option<&str>) -> Result<Course> {
        let code = self.normalize(name).await;
        if let Some(existing) = courses::get_course(&self.db, &code).await? {
            return Ok(existing);
        }

        let channel = self.guild.create_text_channel(&code.to_lowercase()).await?;
        courses::insert_course(&self.db, &code, channel.id, description).await?;
        info!("Linked course {} to channel {}", code, channel.id);

        // Placement is cosmetic; a failure must not lose the new course
        if let Err(e) = organizer::organize_position(&self.db, self.guild.as_ref(), &channel).await {
            warn!("Could not organize channel {}: {}", channel.id, e);
        }

        courses::get_course(&self.db, &code)
            .await?
            .ok_or_else(|| Error::Inconsistency(format!("Course {} vanished after insert", code)))
    }

    /// Link an existing channel as a course, deriving the code from its name
    pub async fn link_channel(&self, channel: &GuildChannel) -> Result<Course> {
        let code = normalize::normalize_token(&channel.name);
        courses::insert_course(&self.db, &code, channel.id, None).await?;
        courses::get_course(&self.db, &code)
            .await?
            .ok_or_else(|| Error::Inconsistency(format!("Course {} vanished after insert", code)))
    }

    /// Unlink a course and tear down its channel (best-effort)
    pub async fn remove_course(&self, code: &str) -> Result<bool> {
        let Some(course) = courses::get_course(&self.db, code).await? else {
            return Ok(false);
        };

        courses::delete_course(&self.db, code).await?;
        if let Err(e) = self.guild.delete_channel(course.channel_id).await {
            warn!("Course {} unlinked but channel {} not deleted: {}", code, course.channel_id, e);
        }
        info!("Unlinked course {}", code);
        Ok(true)
    }

    /// Drop the directory row for a destroyed channel (cascade path).
    ///
    /// Enrollment rows go with the course via the schema's foreign key.
    pub async fn remove_course_by_channel(&self, channel: ChannelId) -> Result<Option<String>> {
        let removed = courses::delete_course_by_channel(&self.db, channel).await?;
        if let Some(code) = &removed {
            info!("Course {} removed with its channel {}", code, channel);
        }
        Ok(removed)
    }

    /// Create a grouping category backed by a fresh category channel
    pub async fn create_category(&self, name: &str) -> Result<ChannelId> {
        let channel = self.guild.create_category_channel(name).await?;
        categories::insert_category(&self.db, channel.id).await?;
        info!("Registered category {} ({})", name, channel.id);
        Ok(channel.id)
    }

    /// Register an existing category channel
    pub async fn register_category(&self, channel: ChannelId) -> Result<()> {
        categories::insert_category(&self.db, channel).await
    }

    /// Configure a category's auto-import rule; negative priority disables it
    pub async fn set_category_auto_import(
        &self,
        channel: ChannelId,
        pattern: Option<&str>,
        priority: i64,
    ) -> Result<()> {
        if let Some(pattern) = pattern {
            // Reject before storing; a stored bad pattern would be skipped on
            // every organizer pass
            if let Err(e) = Regex::new(pattern) {
                return Err(Error::BadRequest(format!("Invalid pattern {:?}: {}", pattern, e)));
            }
        }
        let updated = categories::set_auto_import(&self.db, channel, pattern, priority).await?;
        if !updated {
            return Err(Error::NotFound(format!("No category for channel {}", channel)));
        }
        Ok(())
    }

    /// Remove a category row; the channel itself stays
    pub async fn remove_category(&self, channel: ChannelId) -> Result<bool> {
        categories::delete_category(&self.db, channel).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        categories::list_categories(&self.db).await
    }

    /// Create or redirect an alias; alias and target are stored normalized
    pub async fn set_alias(&self, alias: &str, target: &str, hidden: bool) -> Result<()> {
        let alias = normalize::normalize_token(alias);
        let target = normalize::normalize_token(target);
        aliases::upsert_alias(&self.db, &alias, &target, hidden).await
    }

    /// Resolve an alias to its target code, if one is defined
    pub async fn resolve_alias(&self, code: &str) -> Result<Option<String>> {
        Ok(aliases::get_alias(&self.db, code).await?.map(|a| a.target))
    }

    pub async fn remove_alias(&self, alias: &str) -> Result<bool> {
        aliases::delete_alias(&self.db, &normalize::normalize_token(alias)).await
    }

    pub async fn list_aliases(&self, include_hidden: bool) -> Result<Vec<CourseAlias>> {
        aliases::list_aliases(&self.db, include_hidden).await
    }

    /// Store an auto-create pattern, rejecting ones that do not compile
    pub async fn add_auto_create_pattern(&self, pattern: &str) -> Result<()> {
        if let Err(e) = Regex::new(pattern) {
            return Err(Error::BadRequest(format!("Invalid pattern {:?}: {}", pattern, e)));
        }
        patterns::insert_pattern(&self.db, pattern).await
    }

    pub async fn remove_auto_create_pattern(&self, pattern: &str) -> Result<bool> {
        patterns::delete_pattern(&self.db, pattern).await
    }

    pub async fn list_auto_create_patterns(&self) -> Result<Vec<String>> {
        patterns::list_patterns(&self.db).await
    }

    /// Whether an unlinked code may be created on demand: some stored pattern
    /// matches it and the current catalogue knows it
    pub async fn is_auto_create_eligible(
        &self,
        code: &str,
        catalogue: &CatalogueCache,
    ) -> Result<bool> {
        if !catalogue.contains(code) {
            return Ok(false);
        }

        for pattern in patterns::list_patterns(&self.db).await? {
            let regex = match Regex::new(&pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    warn!("Skipping invalid auto-create pattern {:?}: {}", pattern, e);
                    continue;
                }
            };
            if regex.is_match(code) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Create a catalogue-known course on demand
    pub async fn auto_create(&self, code: &str, catalogue: &CatalogueCache) -> Result<Course> {
        let description = catalogue.description(code);
        self.create_course(code, description.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChannelKind, MemoryGuild};
    use rollcall_common::db::init_memory_database;

    async fn setup() -> (CourseDirectory, Arc<MemoryGuild>) {
        let db = init_memory_database().await.unwrap();
        let guild = Arc::new(MemoryGuild::new());
        (CourseDirectory::new(db, guild.clone()), guild)
    }

    #[tokio::test]
    async fn test_create_course_makes_channel_and_row() {
        let (directory, guild) = setup().await;

        let course = directory.create_course("COMP102", Some("Intro")).await.unwrap();
        assert_eq!(course.code, "COMP-102");

        let channel = guild.channel(course.channel_id).await.unwrap().unwrap();
        assert_eq!(channel.name, "comp-102");
        assert_eq!(channel.kind, ChannelKind::Text);
    }

    #[tokio::test]
    async fn test_create_course_is_idempotent() {
        let (directory, _guild) = setup().await;

        let first = directory.create_course("COMP102", None).await.unwrap();
        let second = directory.create_course("comp 102", None).await.unwrap();
        assert_eq!(first.channel_id, second.channel_id);
        assert_eq!(directory.list_courses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_link_existing_channel() {
        let (directory, guild) = setup().await;
        let channel = guild.insert_channel(ChannelId(42), "comp-102", ChannelKind::Text);

        let course = directory.link_channel(&channel).await.unwrap();
        assert_eq!(course.code, "COMP-102");
        assert_eq!(course.channel_id, ChannelId(42));
    }

    #[tokio::test]
    async fn test_link_free_text_channel_uses_fallback_code() {
        let (directory, guild) = setup().await;
        let channel = guild.insert_channel(ChannelId(42), "General Chat", ChannelKind::Text);

        let course = directory.link_channel(&channel).await.unwrap();
        assert_eq!(course.code, "general chat");
    }

    #[tokio::test]
    async fn test_remove_course_deletes_channel() {
        let (directory, guild) = setup().await;

        let course = directory.create_course("COMP102", None).await.unwrap();
        assert!(directory.remove_course("COMP-102").await.unwrap());

        assert!(guild.channel(course.channel_id).await.unwrap().is_none());
        assert!(!directory.course_exists("COMP-102").await.unwrap());

        // Removing again reports nothing to remove
        assert!(!directory.remove_course("COMP-102").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_auto_create_pattern_is_rejected() {
        let (directory, _guild) = setup().await;
        assert!(directory.add_auto_create_pattern("([unclosed").await.is_err());
        assert!(directory.add_auto_create_pattern("^COMP-1[0-9]{2}$").await.is_ok());
    }

    #[tokio::test]
    async fn test_auto_create_eligibility_needs_pattern_and_catalogue() {
        let (directory, _guild) = setup().await;
        let catalogue = CatalogueCache::new();

        directory.add_auto_create_pattern("^COMP-").await.unwrap();

        // Pattern matches but the catalogue has never heard of it
        assert!(!directory.is_auto_create_eligible("COMP-102", &catalogue).await.unwrap());

        struct One;
        #[async_trait::async_trait]
        impl crate::course::catalogue::CatalogueSource for One {
            fn name(&self) -> String {
                "one".to_string()
            }
            async fn fetch(&self) -> Result<Vec<crate::course::catalogue::CatalogueEntry>> {
                Ok(vec![crate::course::catalogue::CatalogueEntry {
                    code: "COMP102".to_string(),
                    description: "Intro".to_string(),
                }])
            }
        }
        let sources: Vec<Arc<dyn crate::course::catalogue::CatalogueSource>> = vec![Arc::new(One)];
        assert!(catalogue.refresh(&sources).await);

        assert!(directory.is_auto_create_eligible("COMP-102", &catalogue).await.unwrap());
        // Catalogued but matching no stored pattern
        assert!(!directory.is_auto_create_eligible("MATH-201", &catalogue).await.unwrap());
    }

    #[tokio::test]
    async fn test_alias_roundtrip_is_normalized() {
        let (directory, _guild) = setup().await;

        directory.set_alias("intro", "comp102", false).await.unwrap();
        assert_eq!(
            directory.resolve_alias("intro").await.unwrap().as_deref(),
            Some("COMP-102")
        );
        assert!(directory.remove_alias("INTRO ").await.is_ok());
    }
}
