//! Config schema: server socket, browser extraction, relay polling/staleness.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatspoutConfig {
    pub server: ServerConfig,
    pub extract: ExtractConfig,
    pub relay: RelayConfig,
}

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Headless-browser extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub headless: bool,
    /// Per-acquire navigation timeout. Also bounds profile-image lookups.
    pub navigation_timeout_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    pub chrome_path: Option<String>,
    /// Extra arguments appended to the Chrome command line.
    pub chrome_args: Vec<String>,
    /// Unpacked extension loaded into every page (the 7tv overlay that the
    /// twitch selectors extract from).
    pub extension_dir: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_ms: 30_000,
            viewport_width: 1980,
            viewport_height: 1024,
            chrome_path: None,
            chrome_args: Vec::new(),
            extension_dir: None,
            user_agent: None,
        }
    }
}

/// Aggregator polling and staleness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Delay between extraction polls.
    pub poll_interval_ms: u64,
    pub stale: StaleConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            stale: StaleConfig::default(),
        }
    }
}

/// Per-platform staleness budgets, with a fallback for platforms without an
/// explicit section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaleConfig {
    pub default: StaleBudget,
    pub kick: Option<StaleBudget>,
    pub twitch: Option<StaleBudget>,
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            default: StaleBudget::default(),
            kick: Some(StaleBudget {
                warmup_ms: 10_000,
                offline_after_ms: 50_000,
            }),
            // Twitch chat widgets take materially longer to populate after
            // navigation, so the offline check stays disarmed longer.
            twitch: Some(StaleBudget {
                warmup_ms: 30_000,
                offline_after_ms: 50_000,
            }),
        }
    }
}

impl StaleConfig {
    /// Resolve the budget for a platform token (lower-cased), falling back
    /// to the default section.
    pub fn for_platform(&self, platform: &str) -> StaleBudget {
        match platform.to_ascii_lowercase().as_str() {
            "kick" => self.kick.clone(),
            "twitch" => self.twitch.clone(),
            _ => None,
        }
        .unwrap_or_else(|| self.default.clone())
    }
}

/// How long a channel may produce zero new entries before it is declared
/// offline. Time-based, not an iteration count: an empty chat right after
/// navigation ("nothing has loaded yet") is distinct from an empty chat on
/// a channel that truly went quiet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaleBudget {
    /// Grace period after entering the poll loop before staleness accrues.
    pub warmup_ms: u64,
    /// Consecutive-empty-poll time after warmup that declares the channel
    /// offline.
    pub offline_after_ms: u64,
}

impl Default for StaleBudget {
    fn default() -> Self {
        Self {
            warmup_ms: 10_000,
            offline_after_ms: 50_000,
        }
    }
}
