//! Shared app state and the profile-lookup seam.

use {
    async_trait::async_trait,
    chatspout_config::ChatspoutConfig,
    chatspout_extract::ExtractEngine,
    chatspout_protocol::Platform,
    chatspout_relay::{
        AggregatorPolicy, ChannelRegistry, ChatFeed, ChatSource, SourceError, SubscriptionHub,
    },
    std::{sync::Arc, time::Duration},
};

/// Profile-image lookup, as a trait so tests inject fakes.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn profile_image(&self, platform: Platform, url: &str) -> Result<String, SourceError>;
}

#[async_trait]
impl ProfileSource for ExtractEngine {
    async fn profile_image(&self, platform: Platform, url: &str) -> Result<String, SourceError> {
        Ok(ExtractEngine::profile_image(self, platform, url).await?)
    }
}

/// Stand-in source for `--no-browser` runs. Every acquire and lookup fails,
/// so chat channels terminate with an internal error and profile requests
/// report a failure, while health routes stay serviceable.
pub struct BrowserlessSource;

#[async_trait]
impl ChatSource for BrowserlessSource {
    async fn acquire(
        &self,
        url: &str,
        _platform: Platform,
    ) -> Result<Box<dyn ChatFeed>, SourceError> {
        Err(SourceError::Navigation(format!(
            "browser disabled, cannot visit {url}"
        )))
    }
}

#[async_trait]
impl ProfileSource for BrowserlessSource {
    async fn profile_image(&self, _platform: Platform, url: &str) -> Result<String, SourceError> {
        Err(SourceError::Navigation(format!(
            "browser disabled, cannot visit {url}"
        )))
    }
}

/// Shared handles for every route handler and connection controller.
#[derive(Clone)]
pub struct AppState {
    pub registry: ChannelRegistry,
    pub hub: SubscriptionHub,
    pub source: Arc<dyn ChatSource>,
    pub profiles: Arc<dyn ProfileSource>,
    pub config: Arc<ChatspoutConfig>,
}

impl AppState {
    pub fn new(
        source: Arc<dyn ChatSource>,
        profiles: Arc<dyn ProfileSource>,
        config: Arc<ChatspoutConfig>,
    ) -> Self {
        let registry = ChannelRegistry::new();
        let hub = registry.hub();
        Self {
            registry,
            hub,
            source,
            profiles,
            config,
        }
    }

    /// Aggregator policy for one platform: global poll cadence plus the
    /// platform's staleness budget.
    pub fn policy_for(&self, platform: Platform) -> AggregatorPolicy {
        let relay = &self.config.relay;
        let stale = relay.stale.for_platform(platform.as_str());
        AggregatorPolicy {
            poll_interval: Duration::from_millis(relay.poll_interval_ms),
            warmup: Duration::from_millis(stale.warmup_ms),
            offline_after: Duration::from_millis(stale.offline_after_ms),
        }
    }
}
