//! Chat-platform collaborator interfaces
//!
//! The platform adapter itself lives out of tree; the engine consumes the
//! guild through these traits only. Implementations must be cheap to clone
//! behind an Arc and safe to call concurrently.

pub mod memory;

pub use memory::MemoryGuild;

use crate::error::Result;
use async_trait::async_trait;
use rollcall_common::{ChannelId, PermissionSet, RoleId, UserId};
use serde::{Deserialize, Serialize};

/// Kind of guild channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Category,
    /// Voice, forum, and anything else the organizer skips
    Other,
}

/// A channel as seen through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildChannel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    /// Parent category, if nested
    pub parent_id: Option<ChannelId>,
}

/// A principal a permission overwrite can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    /// The implicit "everyone" role
    Everyone,
    Role(RoleId),
    User(UserId),
}

/// Directory of guild state the engine reads and writes
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Look up a channel; Ok(None) when the channel no longer exists
    async fn channel(&self, id: ChannelId) -> Result<Option<GuildChannel>>;

    async fn create_text_channel(&self, name: &str) -> Result<GuildChannel>;

    async fn create_category_channel(&self, name: &str) -> Result<GuildChannel>;

    async fn delete_channel(&self, id: ChannelId) -> Result<()>;

    async fn move_channel_to_category(
        &self,
        channel: ChannelId,
        category: ChannelId,
    ) -> Result<()>;

    /// Current overwrite for a principal; Ok(None) when no overwrite is set
    async fn overwrite(
        &self,
        channel: ChannelId,
        principal: Principal,
    ) -> Result<Option<PermissionSet>>;

    async fn set_overwrite(
        &self,
        channel: ChannelId,
        principal: Principal,
        perms: PermissionSet,
    ) -> Result<()>;

    async fn remove_overwrite(&self, channel: ChannelId, principal: Principal) -> Result<()>;

    /// All user-type overwrites currently present on a channel
    async fn user_overwrites(&self, channel: ChannelId) -> Result<Vec<(UserId, PermissionSet)>>;

    /// Resolve a user id to a live member; Ok(None) when unknown or departed
    async fn resolve_user(&self, id: UserId) -> Result<Option<UserId>>;

    /// Resolve a role id; Ok(None) when the role does not exist
    async fn resolve_role(&self, id: RoleId) -> Result<Option<RoleId>>;
}

/// Read-only query against the identity-verification subsystem
#[async_trait]
pub trait VerificationOracle: Send + Sync {
    async fn is_verified(&self, user: UserId) -> Result<bool>;
}
