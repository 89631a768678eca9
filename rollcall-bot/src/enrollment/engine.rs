//! Enrollment engine
//!
//! Public operation surface for joining and leaving courses. Policy gating
//! (verification, blacklist), alias redirection, and on-demand course
//! creation all happen here before any row is touched. These operations are
//! called in loops over user-supplied token lists, so they never throw past
//! the API boundary: internal errors are logged and degrade to `Failure`.

use super::reconciler::Reconciler;
use crate::course::{normalize, CatalogueCache, CourseDirectory};
use crate::db::{enrollments, users};
use crate::error::{Error, Result};
use crate::gateway::{GuildDirectory, VerificationOracle};
use rollcall_common::db::Course;
use rollcall_common::UserId;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Outcome of an enroll or disenroll operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Membership changed and the channel was reconciled
    Success,
    /// The token resolves to no linked course
    CourseNotExist,
    /// The user was already a member (idempotent enroll)
    AlreadyJoined,
    /// The user was not a member (idempotent disenroll)
    AlreadyLeft,
    /// Verification is required and the user is not verified
    Unverified,
    /// The user carries the join blacklist flag
    Blacklisted,
    /// An internal error was logged; nothing can be said about the outcome
    Failure,
}

/// Rejection produced by [`EnrollmentEngine::check_course_string`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CourseListError {
    #[error("No courses given. Provide one or more course codes, e.g. COMP-102 MATH-201")]
    Empty,
    #[error("Duplicate courses in input: {}", .0.join(", "))]
    Duplicates(Vec<String>),
}

/// Per-course results of a bulk permission restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Courses whose channels were reconciled
    pub applied: usize,
    /// Courses that failed and were skipped
    pub failed: usize,
}

/// The public enrollment operation surface
#[derive(Clone)]
pub struct EnrollmentEngine {
    db: Pool<Sqlite>,
    guild: Arc<dyn GuildDirectory>,
    oracle: Arc<dyn VerificationOracle>,
    directory: CourseDirectory,
    catalogue: Arc<CatalogueCache>,
    reconciler: Reconciler,
    /// When false, unverified users may enroll
    verification_required: bool,
}

impl EnrollmentEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Pool<Sqlite>,
        guild: Arc<dyn GuildDirectory>,
        oracle: Arc<dyn VerificationOracle>,
        directory: CourseDirectory,
        catalogue: Arc<CatalogueCache>,
        reconciler: Reconciler,
        verification_required: bool,
    ) -> Self {
        Self {
            db,
            guild,
            oracle,
            directory,
            catalogue,
            reconciler,
            verification_required,
        }
    }

    /// Enroll a user in the course a token resolves to.
    ///
    /// Policy order: verification gate first, then blacklist; a user failing
    /// both sees `Unverified`. Aliases redirect before course resolution, and
    /// an unlinked code that is pattern-eligible and catalogue-known is
    /// created on demand.
    pub async fn enroll_user(&self, token: &str, user: UserId) -> EnrollmentStatus {
        match self.enroll_inner(token, user).await {
            Ok(status) => status,
            Err(e) => {
                error!("Enrolling {} in {:?} failed: {}", user, token, e);
                EnrollmentStatus::Failure
            }
        }
    }

    async fn enroll_inner(&self, token: &str, user: UserId) -> Result<EnrollmentStatus> {
        if self.requires_verification(user).await? {
            return Ok(EnrollmentStatus::Unverified);
        }
        if users::is_join_blacklisted(&self.db, user).await? {
            return Ok(EnrollmentStatus::Blacklisted);
        }

        let normalized = self.directory.normalize(token).await;
        let code = match self.directory.resolve_alias(&normalized).await? {
            Some(target) => target,
            None => normalized,
        };

        let course = match self.resolve_or_create(&code).await? {
            Some(course) => course,
            None => return Ok(EnrollmentStatus::CourseNotExist),
        };

        // The directory row may outlive the channel it points at
        if self.guild.channel(course.channel_id).await?.is_none() {
            return Err(Error::Inconsistency(format!(
                "Course {} is linked to missing channel {}",
                course.code, course.channel_id
            )));
        }

        if enrollments::is_enrolled(&self.db, user, &course.code).await? {
            return Ok(EnrollmentStatus::AlreadyJoined);
        }

        enrollments::insert_enrollment(&self.db, user, &course.code).await?;
        self.reconciler
            .apply_channel_permissions(course.channel_id)
            .await?;
        info!("{} joined {}", user, course.code);
        Ok(EnrollmentStatus::Success)
    }

    /// Remove a user from the course a token resolves to.
    ///
    /// Aliases are deliberately not consulted here; they redirect joining
    /// only. A code that would be auto-created on join cannot have members
    /// yet, so it reports `AlreadyLeft` rather than `CourseNotExist`.
    pub async fn disenroll_user(&self, token: &str, user: UserId) -> EnrollmentStatus {
        match self.disenroll_inner(token, user).await {
            Ok(status) => status,
            Err(e) => {
                error!("Disenrolling {} from {:?} failed: {}", user, token, e);
                EnrollmentStatus::Failure
            }
        }
    }

    async fn disenroll_inner(&self, token: &str, user: UserId) -> Result<EnrollmentStatus> {
        let code = self.directory.normalize(token).await;

        let Some(course) = self.directory.get_course(&code).await? else {
            if self
                .directory
                .is_auto_create_eligible(&code, &self.catalogue)
                .await?
            {
                return Ok(EnrollmentStatus::AlreadyLeft);
            }
            return Ok(EnrollmentStatus::CourseNotExist);
        };

        if !enrollments::delete_enrollment(&self.db, user, &course.code).await? {
            return Ok(EnrollmentStatus::AlreadyLeft);
        }

        self.reconciler
            .apply_channel_permissions(course.channel_id)
            .await?;
        info!("{} left {}", user, course.code);
        Ok(EnrollmentStatus::Success)
    }

    /// Whether the verification gate blocks this user.
    ///
    /// Unlike enroll/disenroll this is a read-only precheck: an oracle
    /// failure propagates to the caller instead of degrading to a status.
    pub async fn requires_verification(&self, user: UserId) -> Result<bool> {
        if !self.verification_required {
            return Ok(false);
        }
        Ok(!self.oracle.is_verified(user).await?)
    }

    /// Set or clear the per-user join blacklist flag
    pub async fn set_join_blacklisted(&self, user: UserId, flagged: bool) -> Result<()> {
        users::set_join_blacklisted(&self.db, user, flagged).await
    }

    pub async fn is_join_blacklisted(&self, user: UserId) -> Result<bool> {
        users::is_join_blacklisted(&self.db, user).await
    }

    /// Re-reconcile every course a user belongs to.
    ///
    /// Used after the user rejoins the guild to restore per-channel
    /// overwrites. Courses are processed independently; one failure is
    /// counted and the rest proceed.
    pub async fn apply_user_course_permissions(&self, user: UserId) -> Result<RestoreSummary> {
        let mut summary = RestoreSummary::default();

        for code in enrollments::user_courses(&self.db, user).await? {
            let result = async {
                let course = self
                    .directory
                    .get_course(&code)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Course {} has no row", code)))?;
                self.reconciler
                    .apply_channel_permissions(course.channel_id)
                    .await
            }
            .await;

            match result {
                Ok(_) => summary.applied += 1,
                Err(e) => {
                    warn!("Restoring {} for {} failed: {}", code, user, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Validate and normalize a user-supplied course token list.
    ///
    /// Pure string processing: rejects an empty list, collects duplicates
    /// (rejected unless `ignore_duplicates`), and returns the deduplicated
    /// normalized codes in first-seen order.
    pub fn check_course_string(
        tokens: &[String],
        ignore_duplicates: bool,
    ) -> std::result::Result<Vec<String>, CourseListError> {
        if tokens.is_empty() {
            return Err(CourseListError::Empty);
        }

        let mut seen: Vec<String> = Vec::new();
        let mut duplicates: Vec<String> = Vec::new();

        for token in tokens {
            let code = normalize::normalize_token(token);
            if seen.contains(&code) {
                if !duplicates.contains(&code) {
                    duplicates.push(code);
                }
            } else {
                seen.push(code);
            }
        }

        if !duplicates.is_empty() && !ignore_duplicates {
            return Err(CourseListError::Duplicates(duplicates));
        }

        Ok(seen)
    }

    /// All course codes a user belongs to
    pub async fn user_courses(&self, user: UserId) -> Result<Vec<String>> {
        enrollments::user_courses(&self.db, user).await
    }

    /// All members of a course code
    pub async fn course_members(&self, code: &str) -> Result<Vec<UserId>> {
        enrollments::course_members(&self.db, code).await
    }

    /// Resolve a linked course, falling back to on-demand creation when the
    /// code is pattern-eligible and catalogue-known
    async fn resolve_or_create(&self, code: &str) -> Result<Option<Course>> {
        if let Some(course) = self.directory.get_course(code).await? {
            return Ok(Some(course));
        }

        if self
            .directory
            .is_auto_create_eligible(code, &self.catalogue)
            .await?
        {
            info!("Auto-creating course {}", code);
            let course = self.directory.auto_create(code, &self.catalogue).await?;
            return Ok(Some(course));
        }

        Ok(None)
    }
}
