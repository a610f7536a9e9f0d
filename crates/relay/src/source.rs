//! Collaborator boundary to the extraction layer.
//!
//! The core only requires: given a channel's chat page, produce an ordered,
//! newest-first list of chat entries, or fail. Trait objects keep the core
//! free of browser dependencies and let tests script the feed.

use {
    async_trait::async_trait,
    chatspout_protocol::{ChatEntry, Platform},
    thiserror::Error,
};

/// Failures crossing the extraction boundary. All of them are terminal for
/// the channel; the re-poll loop never retries a hard failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

/// Produces extraction sessions for chat pages.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Open the chat page at `url` and return a live feed for it. Bounded
    /// by the implementation's own navigation timeout.
    async fn acquire(&self, url: &str, platform: Platform)
    -> Result<Box<dyn ChatFeed>, SourceError>;
}

/// One extraction session, owned exclusively by one aggregator.
#[async_trait]
pub trait ChatFeed: Send {
    /// Snapshot the currently visible chat entries, newest-first.
    async fn poll(&mut self) -> Result<Vec<ChatEntry>, SourceError>;

    /// Release the session. Idempotent; always safe to call again.
    async fn release(&mut self);
}
