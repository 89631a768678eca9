//! Permission reconciliation for course channels
//!
//! Converges a channel's live overwrite list to the desired state derived
//! from the permission policy and stored membership. The pass is a diff, not
//! a replace: it only writes where actual and desired differ, so repeated
//! calls at a fixed point issue zero writes. Per-principal failures are
//! collected into the summary and never abort the rest of the pass.

use crate::db::{courses, enrollments};
use crate::error::{Error, Result};
use crate::gateway::{GuildDirectory, Principal};
use rollcall_common::{ChannelId, PermissionPolicy, PermissionSet, UserId};
use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Role-level overwrites rewritten (everyone, verified, named overrides)
    pub roles_updated: usize,
    /// Named role overrides that failed and were skipped
    pub roles_failed: usize,
    /// Member overwrites added for enrolled users missing one
    pub members_added: usize,
    /// Member overwrites removed for users no longer enrolled
    pub members_removed: usize,
    /// Drifted member overwrites rewritten to the configured mask
    pub members_repaired: usize,
    /// Members skipped because their identity did not resolve
    pub members_skipped: usize,
    /// Member overwrite writes that failed and were skipped
    pub members_failed: usize,
}

impl ReconcileSummary {
    /// Total overwrite writes issued by the pass
    pub fn writes(&self) -> usize {
        self.roles_updated + self.members_added + self.members_removed + self.members_repaired
    }
}

/// Result of reconciling one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The channel is not linked to any course; nothing was touched
    NotACourse,
    /// The pass completed (possibly with per-item skips)
    Converged(ReconcileSummary),
}

/// Applies the permission policy to course channels
#[derive(Clone)]
pub struct Reconciler {
    db: Pool<Sqlite>,
    guild: Arc<dyn GuildDirectory>,
    policy: PermissionPolicy,
    /// Pause between successive per-user writes in a bulk pass; best-effort
    /// rate-limit mitigation only
    overwrite_delay: Duration,
}

impl Reconciler {
    pub fn new(
        db: Pool<Sqlite>,
        guild: Arc<dyn GuildDirectory>,
        policy: PermissionPolicy,
        overwrite_delay: Duration,
    ) -> Self {
        Self {
            db,
            guild,
            policy,
            overwrite_delay,
        }
    }

    /// Converge one channel's overwrites to the desired state.
    ///
    /// Fails hard only on misconfiguration (unresolvable verified role) or a
    /// broken gateway/database; individual principal failures are logged,
    /// counted, and skipped.
    pub async fn apply_channel_permissions(&self, channel: ChannelId) -> Result<ReconcileOutcome> {
        let Some(course) = courses::get_course_by_channel(&self.db, channel).await? else {
            return Ok(ReconcileOutcome::NotACourse);
        };

        let mut summary = ReconcileSummary::default();

        // Everyone and verified carry the configured channel-wide masks
        if self
            .sync_overwrite(channel, Principal::Everyone, self.policy.everyone)
            .await?
        {
            summary.roles_updated += 1;
        }

        let verified_role = self
            .guild
            .resolve_role(self.policy.verified_role_id)
            .await?
            .ok_or_else(|| {
                Error::Config(format!(
                    "Verified role {} does not exist",
                    self.policy.verified_role_id
                ))
            })?;
        if self
            .sync_overwrite(channel, Principal::Role(verified_role), self.policy.verified)
            .await?
        {
            summary.roles_updated += 1;
        }

        // Named role overrides; one failure must not block the others
        for role_override in &self.policy.role_overrides {
            let result = async {
                let role = self
                    .guild
                    .resolve_role(role_override.role_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Gateway(format!("Role {} does not exist", role_override.role_id))
                    })?;
                self.sync_overwrite(channel, Principal::Role(role), role_override.perms)
                    .await
            }
            .await;

            match result {
                Ok(true) => summary.roles_updated += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Role override {} on channel {} failed: {}",
                        role_override.role_id, channel, e
                    );
                    summary.roles_failed += 1;
                }
            }
        }

        // Desired membership vs. the channel's live user overwrites
        let should_be: HashSet<UserId> = enrollments::course_members(&self.db, &course.code)
            .await?
            .into_iter()
            .collect();
        let current: HashMap<UserId, PermissionSet> = self
            .guild
            .user_overwrites(channel)
            .await?
            .into_iter()
            .collect();

        // Repair drifted overwrites for members who should keep one
        for (user, perms) in &current {
            if should_be.contains(user) && *perms != self.policy.member {
                match self.write_member_overwrite(channel, *user).await {
                    Ok(true) => summary.members_repaired += 1,
                    Ok(false) => summary.members_skipped += 1,
                    Err(e) => {
                        warn!("Repairing overwrite for {} on {} failed: {}", user, channel, e);
                        summary.members_failed += 1;
                    }
                }
            }
        }

        // Remove overwrites for users no longer enrolled
        for user in current.keys().filter(|u| !should_be.contains(*u)) {
            match self
                .guild
                .remove_overwrite(channel, Principal::User(*user))
                .await
            {
                Ok(()) => {
                    summary.members_removed += 1;
                    self.throttle().await;
                }
                Err(e) => {
                    warn!("Removing overwrite for {} on {} failed: {}", user, channel, e);
                    summary.members_failed += 1;
                }
            }
        }

        // Add overwrites for enrolled users missing one
        for user in should_be.iter().filter(|u| !current.contains_key(*u)) {
            match self.write_member_overwrite(channel, *user).await {
                Ok(true) => summary.members_added += 1,
                Ok(false) => summary.members_skipped += 1,
                Err(e) => {
                    warn!("Adding overwrite for {} on {} failed: {}", user, channel, e);
                    summary.members_failed += 1;
                }
            }
        }

        debug!(
            "Reconciled {} ({}): {} writes, {} skipped, {} failed",
            course.code,
            channel,
            summary.writes(),
            summary.members_skipped,
            summary.roles_failed + summary.members_failed
        );
        Ok(ReconcileOutcome::Converged(summary))
    }

    /// Write an overwrite only when it differs from the current one.
    ///
    /// **Returns:** true if a write was issued
    async fn sync_overwrite(
        &self,
        channel: ChannelId,
        principal: Principal,
        desired: PermissionSet,
    ) -> Result<bool> {
        let current = self.guild.overwrite(channel, principal).await?;
        if current == Some(desired) {
            return Ok(false);
        }
        self.guild.set_overwrite(channel, principal, desired).await?;
        Ok(true)
    }

    /// Grant the member mask to a user, resolving the identity lazily.
    ///
    /// **Returns:** false when the user does not resolve (skip, not failure)
    async fn write_member_overwrite(&self, channel: ChannelId, user: UserId) -> Result<bool> {
        let Some(user) = self.guild.resolve_user(user).await? else {
            debug!("User {} does not resolve, skipping overwrite on {}", user, channel);
            return Ok(false);
        };
        self.guild
            .set_overwrite(channel, Principal::User(user), self.policy.member)
            .await?;
        self.throttle().await;
        Ok(true)
    }

    async fn throttle(&self) {
        if !self.overwrite_delay.is_zero() {
            tokio::time::sleep(self.overwrite_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{courses, enrollments};
    use crate::gateway::{ChannelKind, MemoryGuild};
    use rollcall_common::db::init_memory_database;
    use rollcall_common::ids::RoleId;
    use rollcall_common::perms::RoleOverride;

    const CHANNEL: ChannelId = ChannelId(42);
    const VERIFIED_ROLE: RoleId = RoleId(900);

    fn policy() -> PermissionPolicy {
        PermissionPolicy {
            everyone: PermissionSet::new(0, 1024),
            verified: PermissionSet::new(0, 1024),
            member: PermissionSet::new(3072, 0),
            verified_role_id: VERIFIED_ROLE,
            role_overrides: Vec::new(),
        }
    }

    async fn setup(policy: PermissionPolicy) -> (Reconciler, Arc<MemoryGuild>, Pool<Sqlite>) {
        let db = init_memory_database().await.unwrap();
        let guild = Arc::new(MemoryGuild::new());
        guild.add_role(VERIFIED_ROLE);
        guild.insert_channel(CHANNEL, "comp-102", ChannelKind::Text);
        courses::insert_course(&db, "COMP-102", CHANNEL, None).await.unwrap();

        let reconciler = Reconciler::new(db.clone(), guild.clone(), policy, Duration::ZERO);
        (reconciler, guild, db)
    }

    async fn enroll(db: &Pool<Sqlite>, guild: &MemoryGuild, user: UserId) {
        guild.add_member(user);
        enrollments::insert_enrollment(db, user, "COMP-102").await.unwrap();
    }

    #[tokio::test]
    async fn test_unlinked_channel_is_not_a_course() {
        let (reconciler, guild, _db) = setup(policy()).await;
        guild.insert_channel(ChannelId(99), "lounge", ChannelKind::Text);

        let outcome = reconciler.apply_channel_permissions(ChannelId(99)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::NotACourse);
    }

    #[tokio::test]
    async fn test_missing_verified_role_is_a_hard_error() {
        let mut bad = policy();
        bad.verified_role_id = RoleId(999999);
        let (reconciler, _guild, _db) = setup(bad).await;

        let result = reconciler.apply_channel_permissions(CHANNEL).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_convergence_to_membership_set() {
        let (reconciler, guild, db) = setup(policy()).await;

        // Desired members
        for id in [1, 2, 3] {
            enroll(&db, &guild, UserId(id)).await;
        }
        // Stale overwrite for a user who is not enrolled
        guild.add_member(UserId(9));
        guild.seed_overwrite(CHANNEL, Principal::User(UserId(9)), PermissionSet::new(3072, 0));
        // Drifted overwrite for an enrolled user
        guild.seed_overwrite(CHANNEL, Principal::User(UserId(1)), PermissionSet::new(1024, 1024));

        let outcome = reconciler.apply_channel_permissions(CHANNEL).await.unwrap();
        let ReconcileOutcome::Converged(summary) = outcome else {
            panic!("expected a converged pass");
        };
        assert_eq!(summary.members_added, 2);
        assert_eq!(summary.members_removed, 1);
        assert_eq!(summary.members_repaired, 1);

        // Live state now mirrors the membership set exactly
        let mut live: Vec<(UserId, PermissionSet)> =
            guild.user_overwrites(CHANNEL).await.unwrap();
        live.sort_by_key(|(user, _)| *user);
        assert_eq!(
            live,
            vec![
                (UserId(1), PermissionSet::new(3072, 0)),
                (UserId(2), PermissionSet::new(3072, 0)),
                (UserId(3), PermissionSet::new(3072, 0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_pass_issues_zero_writes() {
        let (reconciler, guild, db) = setup(policy()).await;
        for id in [1, 2] {
            enroll(&db, &guild, UserId(id)).await;
        }

        reconciler.apply_channel_permissions(CHANNEL).await.unwrap();
        let writes_after_first = guild.write_call_count();

        let outcome = reconciler.apply_channel_permissions(CHANNEL).await.unwrap();
        let ReconcileOutcome::Converged(summary) = outcome else {
            panic!("expected a converged pass");
        };
        assert_eq!(summary.writes(), 0);
        assert_eq!(guild.write_call_count(), writes_after_first);
    }

    #[tokio::test]
    async fn test_unresolvable_user_is_skipped_not_fatal() {
        let (reconciler, guild, db) = setup(policy()).await;
        enroll(&db, &guild, UserId(1)).await;
        // Enrolled but departed from the guild
        enrollments::insert_enrollment(&db, UserId(2), "COMP-102").await.unwrap();

        let outcome = reconciler.apply_channel_permissions(CHANNEL).await.unwrap();
        let ReconcileOutcome::Converged(summary) = outcome else {
            panic!("expected a converged pass");
        };
        assert_eq!(summary.members_added, 1);
        assert_eq!(summary.members_skipped, 1);
    }

    #[tokio::test]
    async fn test_one_failing_write_does_not_block_the_batch() {
        let (reconciler, guild, db) = setup(policy()).await;
        for id in 1..=5 {
            enroll(&db, &guild, UserId(id)).await;
        }
        guild.fail_writes_for(UserId(3));

        let outcome = reconciler.apply_channel_permissions(CHANNEL).await.unwrap();
        let ReconcileOutcome::Converged(summary) = outcome else {
            panic!("expected a converged pass");
        };
        assert_eq!(summary.members_added, 4);
        assert_eq!(summary.members_failed, 1);
    }

    #[tokio::test]
    async fn test_role_override_failure_does_not_abort_pass() {
        let mut with_overrides = policy();
        with_overrides.role_overrides = vec![
            RoleOverride {
                role_id: RoleId(777), // never registered in the guild
                perms: PermissionSet::new(1024, 0),
            },
            RoleOverride {
                role_id: RoleId(778),
                perms: PermissionSet::new(1024, 0),
            },
        ];
        let (reconciler, guild, db) = setup(with_overrides).await;
        guild.add_role(RoleId(778));
        enroll(&db, &guild, UserId(1)).await;

        let outcome = reconciler.apply_channel_permissions(CHANNEL).await.unwrap();
        let ReconcileOutcome::Converged(summary) = outcome else {
            panic!("expected a converged pass");
        };
        assert_eq!(summary.roles_failed, 1);
        // everyone + verified + surviving override all written, member added
        assert_eq!(summary.roles_updated, 3);
        assert_eq!(summary.members_added, 1);
    }
}
