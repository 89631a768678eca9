//! Permission bitmasks and the per-deployment channel permission policy
//!
//! Every course channel carries the same overwrite layout: an "everyone"
//! overwrite, an overwrite for the verified role, a fixed list of named role
//! overrides, and one per-user overwrite per enrolled member. The bitmask
//! values are deployment configuration, not code.

use crate::ids::RoleId;
use serde::{Deserialize, Serialize};

/// Commonly used permission bits (platform-defined values)
pub mod bits {
    /// View the channel
    pub const VIEW_CHANNEL: u64 = 1 << 10;
    /// Send messages in the channel
    pub const SEND_MESSAGES: u64 = 1 << 11;
    /// Read message history
    pub const READ_MESSAGE_HISTORY: u64 = 1 << 16;
}

/// An allow/deny bitmask pair for a single principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    /// Explicitly granted permission bits
    #[serde(default)]
    pub allow: u64,
    /// Explicitly denied permission bits
    #[serde(default)]
    pub deny: u64,
}

impl PermissionSet {
    pub fn new(allow: u64, deny: u64) -> Self {
        Self { allow, deny }
    }

    /// True when neither mask carries any bits
    pub fn is_empty(self) -> bool {
        self.allow == 0 && self.deny == 0
    }
}

/// A fixed role override applied to every course channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOverride {
    /// Role the override applies to
    pub role_id: RoleId,
    #[serde(flatten)]
    pub perms: PermissionSet,
}

/// Per-deployment permission policy for course channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    /// Overwrite for the "everyone" principal
    pub everyone: PermissionSet,
    /// Overwrite for the verified role
    pub verified: PermissionSet,
    /// Overwrite granted to each enrolled member
    pub member: PermissionSet,
    /// Role carrying the "verified" marker; must resolve at reconcile time
    pub verified_role_id: RoleId,
    /// Additional role overrides applied to every course channel
    #[serde(default, rename = "role_overrides")]
    pub role_overrides: Vec<RoleOverride>,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            // Hide course channels from the unverified public, show them to
            // verified members, and grant enrolled members the full view.
            everyone: PermissionSet::new(0, bits::VIEW_CHANNEL),
            verified: PermissionSet::new(0, bits::VIEW_CHANNEL),
            member: PermissionSet::new(
                bits::VIEW_CHANNEL | bits::SEND_MESSAGES | bits::READ_MESSAGE_HISTORY,
                0,
            ),
            verified_role_id: RoleId(0),
            role_overrides: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_set_is_empty() {
        assert!(PermissionSet::default().is_empty());
        assert!(!PermissionSet::new(bits::VIEW_CHANNEL, 0).is_empty());
    }

    #[test]
    fn test_policy_deserializes_from_toml() {
        let toml_src = r#"
            verified_role_id = 900100

            [everyone]
            deny = 1024

            [verified]
            allow = 0
            deny = 1024

            [member]
            allow = 68608

            [[role_overrides]]
            role_id = 900200
            allow = 1024
            deny = 0
        "#;

        let policy: PermissionPolicy = toml::from_str(toml_src).unwrap();
        assert_eq!(policy.everyone, PermissionSet::new(0, 1024));
        assert_eq!(policy.verified_role_id, RoleId(900100));
        assert_eq!(policy.role_overrides.len(), 1);
        assert_eq!(policy.role_overrides[0].perms.allow, 1024);
    }

    #[test]
    fn test_default_member_mask_includes_view() {
        let policy = PermissionPolicy::default();
        assert_ne!(policy.member.allow & bits::VIEW_CHANNEL, 0);
    }
}
