//! Course token canonicalization
//!
//! Course codes canonicalize to `PREFIX-NNN` (uppercase prefix, numeric
//! suffix). Tokens that do not look like a course code fall back to
//! lowercased, trimmed free text — general-purpose channels imported as
//! courses keep their names this way. Normalization is idempotent:
//! `normalize_token(normalize_token(x)) == normalize_token(x)`.

use crate::gateway::GuildDirectory;
use once_cell::sync::Lazy;
use regex::Regex;
use rollcall_common::ChannelId;
use tracing::warn;

static COURSE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+)[ \-_]?([0-9]+)").unwrap());

static CHANNEL_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<#([0-9]+)>$").unwrap());

/// Canonicalize a raw token to `PREFIX-NNN`, if it matches the course shape
pub fn canonical_code(raw: &str) -> Option<String> {
    COURSE_CODE.captures(raw).map(|caps| {
        format!("{}-{}", caps[1].to_uppercase(), &caps[2])
    })
}

/// Normalize a course token (pure part, no mention resolution)
pub fn normalize_token(raw: &str) -> String {
    canonical_code(raw).unwrap_or_else(|| raw.trim().to_lowercase())
}

/// Normalize a course token, resolving a channel mention first.
///
/// Mention resolution is best-effort: a mention of an unknown channel is
/// logged and the raw string normalizes as-is.
pub async fn normalize(raw: &str, guild: &dyn GuildDirectory) -> String {
    let mut token = raw;
    let resolved_name;

    if let Some(caps) = CHANNEL_MENTION.captures(raw.trim()) {
        let id: ChannelId = caps[1].parse::<i64>().map(ChannelId).unwrap_or(ChannelId(0));
        match guild.channel(id).await {
            Ok(Some(channel)) => {
                resolved_name = channel.name;
                token = &resolved_name;
            }
            Ok(None) => {
                warn!("Channel mention {} does not resolve, using raw token", raw);
            }
            Err(e) => {
                warn!("Channel mention lookup failed for {}: {}", raw, e);
            }
        }
    }

    normalize_token(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChannelKind, MemoryGuild};

    #[test]
    fn test_canonical_forms() {
        assert_eq!(normalize_token("COMP102"), "COMP-102");
        assert_eq!(normalize_token("comp 102"), "COMP-102");
        assert_eq!(normalize_token("comp-102"), "COMP-102");
        assert_eq!(normalize_token("comp_102"), "COMP-102");
        assert_eq!(normalize_token("Comp102"), "COMP-102");
    }

    #[test]
    fn test_free_text_fallback() {
        assert_eq!(normalize_token("  General Chat  "), "general chat");
        assert_eq!(normalize_token("lounge"), "lounge");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in ["COMP102", "comp 102", "  General Chat  ", "lounge", "a1b2"] {
            let once = normalize_token(raw);
            assert_eq!(normalize_token(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[tokio::test]
    async fn test_mention_resolves_to_channel_name() {
        let guild = MemoryGuild::new();
        guild.insert_channel(ChannelId(42), "comp-102", ChannelKind::Text);

        assert_eq!(normalize("<#42>", &guild).await, "COMP-102");
    }

    #[tokio::test]
    async fn test_unresolvable_mention_falls_back_to_raw() {
        let guild = MemoryGuild::new();
        // No such channel; the mention text itself goes through the fallback
        assert_eq!(normalize("<#42>", &guild).await, normalize_token("<#42>"));
    }
}
