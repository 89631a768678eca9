//! Gateway lifecycle events the engine reacts to
//!
//! The platform adapter (out of tree) translates its callbacks into this
//! enum. Handling is idempotent: replaying an event converges to the same
//! state.

use crate::course::CourseDirectory;
use crate::enrollment::EnrollmentEngine;
use crate::error::Result;
use rollcall_common::{ChannelId, UserId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// External lifecycle events relevant to enrollment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A channel was destroyed on the platform side
    ChannelDeleted { channel_id: ChannelId },
    /// A member rejoined the guild after leaving
    MemberRejoined { user_id: UserId },
}

/// Apply one gateway event to stored state
pub async fn handle_gateway_event(
    directory: &CourseDirectory,
    engine: &EnrollmentEngine,
    event: GatewayEvent,
) -> Result<()> {
    match event {
        GatewayEvent::ChannelDeleted { channel_id } => {
            // A destroyed channel takes its course (and, via the schema's
            // cascade, its enrollments) or its category row with it
            if directory.remove_course_by_channel(channel_id).await?.is_none()
                && directory.remove_category(channel_id).await?
            {
                info!("Category removed with its channel {}", channel_id);
            }
            Ok(())
        }
        GatewayEvent::MemberRejoined { user_id } => {
            let summary = engine.apply_user_course_permissions(user_id).await?;
            info!(
                "Restored permissions for {}: {} applied, {} failed",
                user_id, summary.applied, summary.failed
            );
            Ok(())
        }
    }
}
