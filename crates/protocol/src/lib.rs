//! Shared wire types for the chatspout relay.
//!
//! Server → client frames are a JSON array of [`ChatEntry`], oldest-first,
//! one frame per publish. Clients never send application frames; the close
//! codes in [`close`] are the whole downstream error surface.

use std::{collections::BTreeMap, fmt, str::FromStr};

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// Username sentinel for rows the extraction script could not parse.
pub const ERR_USER: &str = "ERR";

// ── Close codes ──────────────────────────────────────────────────────────────

/// WebSocket close codes used by the streaming protocol.
pub mod close {
    /// Client sent an application frame on the push-only protocol.
    pub const MESSAGE_PROHIBITED: u16 = 4000;
    /// Validation failure, or the channel went offline.
    pub const BAD_REQUEST: u16 = 4001;
    /// Reserved, currently unused.
    pub const UNAUTHORIZED: u16 = 4002;
    /// Extraction/navigation failure or unimplemented platform.
    pub const INTERNAL_SERVER_ERROR: u16 = 1011;
}

// ── Platform ─────────────────────────────────────────────────────────────────

/// Streaming platforms the relay knows about.
///
/// All four tokens pass validation; only `KICK` and `TWITCH` have working
/// extraction. The other two fail fast at aggregator start with an
/// unimplemented-platform close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Kick,
    Twitch,
    Twitter,
    Youtube,
}

impl Platform {
    /// The popout/embedded chat page for a streamer, or `None` when the
    /// platform has no extraction support yet.
    pub fn chat_url(&self, streamer: &str) -> Option<String> {
        match self {
            Self::Kick => Some(format!("https://kick.com/{streamer}/chatroom")),
            Self::Twitch => Some(format!("https://twitch.tv/popout/{streamer}/chat")),
            Self::Twitter | Self::Youtube => None,
        }
    }

    /// The streamer's main channel page (used for profile-image lookup).
    pub fn site_url(&self, streamer: &str) -> Option<String> {
        match self {
            Self::Kick => Some(format!("https://kick.com/{streamer}")),
            Self::Twitch => Some(format!("https://twitch.tv/{streamer}")),
            Self::Twitter | Self::Youtube => None,
        }
    }

    /// Canonical upper-case token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kick => "KICK",
            Self::Twitch => "TWITCH",
            Self::Twitter => "TWITTER",
            Self::Youtube => "YOUTUBE",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    /// Case-insensitive; unknown tokens are a hard validation failure.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KICK" => Ok(Self::Kick),
            "TWITCH" => Ok(Self::Twitch),
            "TWITTER" => Ok(Self::Twitter),
            "YOUTUBE" => Ok(Self::Youtube),
            _ => Err(ValidationError::UnknownPlatform(s.to_string())),
        }
    }
}

// ── Channel key ──────────────────────────────────────────────────────────────

/// Rejected connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no streamer provided")]
    EmptyStreamer,

    #[error("invalid platform: {0}")]
    UnknownPlatform(String),
}

/// One live chat feed: a canonicalized (platform, streamer) pair.
///
/// A composite key rather than a concatenated string, so a streamer name
/// containing a platform token can never collide with another channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub platform: Platform,
    pub streamer: String,
}

impl ChannelKey {
    /// Build a key from already-validated parts, lower-casing the streamer.
    pub fn new(platform: Platform, streamer: &str) -> Self {
        Self {
            platform,
            streamer: streamer.to_ascii_lowercase(),
        }
    }

    /// Canonicalize and validate raw route parameters.
    pub fn parse(platform: &str, streamer: &str) -> Result<Self, ValidationError> {
        let platform = Platform::from_str(platform)?;
        if streamer.trim().is_empty() {
            return Err(ValidationError::EmptyStreamer);
        }
        Ok(Self::new(platform, streamer))
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.streamer)
    }
}

// ── Chat entries ─────────────────────────────────────────────────────────────

/// A badge shown next to a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    pub img: String,
}

/// One rendered chat line.
///
/// Created fresh on every poll and never persisted. There is no stable
/// message ID in the source markup, so diff identity is the
/// (userName, content) pair — see [`Fingerprint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub user_name: String,
    #[serde(default = "default_color")]
    pub user_color: [u8; 3],
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<Badge>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emote_container: Option<BTreeMap<String, String>>,
}

fn default_color() -> [u8; 3] {
    [0, 0, 0]
}

impl ChatEntry {
    /// An unparseable row with no visible content; dropped by extraction.
    pub fn is_blank_err(&self) -> bool {
        self.user_name == ERR_USER && self.content.is_empty()
    }
}

/// Diff identity of the most recently published entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_name: String,
    pub content: String,
}

impl Fingerprint {
    pub fn matches(&self, entry: &ChatEntry) -> bool {
        self.user_name == entry.user_name && self.content == entry.content
    }
}

impl From<&ChatEntry> for Fingerprint {
    fn from(entry: &ChatEntry) -> Self {
        Self {
            user_name: entry.user_name.clone(),
            content: entry.content.clone(),
        }
    }
}

// ── HTTP envelope ────────────────────────────────────────────────────────────

/// JSON body for plain HTTP responses: `{"status":200,"message":"Ok"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub status: u16,
    pub message: String,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parse_is_case_insensitive() {
        assert_eq!("kick".parse::<Platform>().unwrap(), Platform::Kick);
        assert_eq!("Twitch".parse::<Platform>().unwrap(), Platform::Twitch);
        assert_eq!("YOUTUBE".parse::<Platform>().unwrap(), Platform::Youtube);
    }

    #[test]
    fn platform_parse_rejects_unknown_tokens() {
        assert!(matches!(
            "rumble".parse::<Platform>(),
            Err(ValidationError::UnknownPlatform(_))
        ));
    }

    #[test]
    fn chat_url_only_for_implemented_platforms() {
        assert_eq!(
            Platform::Kick.chat_url("xqc").as_deref(),
            Some("https://kick.com/xqc/chatroom")
        );
        assert_eq!(
            Platform::Twitch.chat_url("xqc").as_deref(),
            Some("https://twitch.tv/popout/xqc/chat")
        );
        assert!(Platform::Twitter.chat_url("xqc").is_none());
        assert!(Platform::Youtube.chat_url("xqc").is_none());
    }

    #[test]
    fn channel_key_canonicalizes_streamer() {
        let key = ChannelKey::parse("KICK", "XQC").unwrap();
        assert_eq!(key.streamer, "xqc");
        assert_eq!(key.to_string(), "KICK/xqc");
    }

    #[test]
    fn channel_key_rejects_empty_streamer() {
        assert_eq!(
            ChannelKey::parse("twitch", "  "),
            Err(ValidationError::EmptyStreamer)
        );
    }

    #[test]
    fn distinct_platforms_never_collide() {
        // "kickfoo" on TWITCH must not equal "foo" on KICK, which a
        // concatenated "KICK" + "foo" style key would conflate.
        let a = ChannelKey::parse("twitch", "kickfoo").unwrap();
        let b = ChannelKey::parse("kick", "foo").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn chat_entry_wire_shape_is_camel_case() {
        let entry = ChatEntry {
            user_name: "alice".into(),
            user_color: [255, 0, 128],
            content: "hi chat".into(),
            badges: None,
            emote_container: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["userName"], "alice");
        assert_eq!(json["userColor"], serde_json::json!([255, 0, 128]));
        assert_eq!(json["content"], "hi chat");
        // Optional fields are absent, not null.
        assert!(json.get("badges").is_none());
        assert!(json.get("emoteContainer").is_none());
    }

    #[test]
    fn chat_entry_color_defaults_on_deserialize() {
        let entry: ChatEntry =
            serde_json::from_str(r#"{"userName":"bob","content":"yo"}"#).unwrap();
        assert_eq!(entry.user_color, [0, 0, 0]);
    }

    #[test]
    fn fingerprint_matches_on_name_and_content() {
        let entry = ChatEntry {
            user_name: "alice".into(),
            user_color: [0, 0, 0],
            content: "hi".into(),
            badges: None,
            emote_container: None,
        };
        let fp = Fingerprint::from(&entry);
        assert!(fp.matches(&entry));

        let other = ChatEntry {
            content: "bye".into(),
            ..entry
        };
        assert!(!fp.matches(&other));
    }
}
