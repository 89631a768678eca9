//! Category placement for course channels
//!
//! Categories with a non-negative auto-import priority are scanned highest
//! priority first (ties by channel id); the first stored pattern matching the
//! channel name wins and the channel moves under that category. No match
//! leaves the channel where it is.

use crate::db::categories;
use crate::error::Result;
use crate::gateway::{ChannelKind, GuildChannel, GuildDirectory};
use regex::RegexBuilder;
use rollcall_common::ChannelId;
use sqlx::{Pool, Sqlite};
use tracing::{debug, warn};

/// Move a channel under the first matching auto-import category.
///
/// **Returns:** the category the channel was moved under, or None when the
/// channel is not a text channel or no pattern matched.
pub async fn organize_position(
    db: &Pool<Sqlite>,
    guild: &dyn GuildDirectory,
    channel: &GuildChannel,
) -> Result<Option<ChannelId>> {
    if channel.kind != ChannelKind::Text {
        return Ok(None);
    }

    for category in categories::list_auto_import(db).await? {
        let Some(pattern) = &category.pattern else {
            continue;
        };

        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => regex,
            Err(e) => {
                // One bad regex must not block the other categories
                warn!(
                    "Skipping category {} with invalid pattern {:?}: {}",
                    category.channel_id, pattern, e
                );
                continue;
            }
        };

        if regex.is_match(&channel.name) {
            guild
                .move_channel_to_category(channel.id, category.channel_id)
                .await?;
            debug!(
                "Moved channel {} ({}) under category {}",
                channel.name, channel.id, category.channel_id
            );
            return Ok(Some(category.channel_id));
        }
    }

    Ok(None)
}
