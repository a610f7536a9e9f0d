//! Per-channel aggregator task.
//!
//! Exactly one aggregator runs per active channel. It owns the channel's
//! extraction session, polls it, diffs each snapshot against the last
//! published fingerprint, fans new entries out through the hub, and tears
//! the channel down on failure, staleness, or loss of the last subscriber.
//!
//! The loop suspends at three points per iteration — session acquire, poll,
//! and the inter-poll sleep — so teardown is observed within one poll
//! interval plus one extraction round-trip.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    chatspout_protocol::{ChannelKey, Fingerprint, close},
    tokio::task::JoinHandle,
    tracing::{debug, info, trace, warn},
};

use crate::{
    diff::diff_entries,
    hub::SubscriptionHub,
    registry::{AggregatorState, ChannelRegistry},
    source::ChatSource,
};

/// Poll cadence and staleness budget for one aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorPolicy {
    /// Fixed delay between polls.
    pub poll_interval: Duration,
    /// Grace period after startup before empty polls count as stale. Chat
    /// widgets can take a while to populate after navigation; silence during
    /// warm-up is not evidence the channel is offline.
    pub warmup: Duration,
    /// Continuous stale time after warm-up that declares the channel offline.
    pub offline_after: Duration,
}

impl Default for AggregatorPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            warmup: Duration::from_secs(10),
            offline_after: Duration::from_secs(50),
        }
    }
}

/// One channel's aggregation task, ready to spawn.
pub struct Aggregator {
    pub registry: ChannelRegistry,
    pub hub: SubscriptionHub,
    pub source: Arc<dyn ChatSource>,
    pub key: ChannelKey,
    pub policy: AggregatorPolicy,
}

impl Aggregator {
    /// Run the channel lifecycle on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let key = self.key.clone();
        self.registry.set_state(&key, AggregatorState::Starting);

        let Some(url) = key.platform.chat_url(&key.streamer) else {
            warn!(channel = %key, "platform has no extraction support");
            self.terminate(
                close::INTERNAL_SERVER_ERROR,
                &format!("call to {} is unimplemented", key.platform),
            );
            return;
        };

        let mut feed = match self.source.acquire(&url, key.platform).await {
            Ok(feed) => feed,
            Err(e) => {
                warn!(channel = %key, url, error = %e, "failed to open chat page");
                self.terminate(
                    close::INTERNAL_SERVER_ERROR,
                    &format!("error on visiting {url}"),
                );
                return;
            },
        };

        self.registry.set_state(&key, AggregatorState::Running);
        info!(channel = %key, url, "aggregator running");
        let started = Instant::now();

        while self.registry.subscriber_count(&key) > 0 {
            let entries = match feed.poll().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(channel = %key, url, error = %e, "extraction poll failed");
                    feed.release().await;
                    self.terminate(
                        close::INTERNAL_SERVER_ERROR,
                        &format!("error on extracting {url}"),
                    );
                    return;
                },
            };

            let fingerprint = self.registry.fingerprint(&key);
            let fresh = diff_entries(&entries, fingerprint.as_ref());

            if fresh.is_empty() {
                trace!(channel = %key, window = entries.len(), "no new entries");
                if started.elapsed() >= self.policy.warmup {
                    let (_, stale_for) = self.registry.mark_stale(&key, Instant::now());
                    if stale_for >= self.policy.offline_after {
                        info!(channel = %key, stale_for_ms = stale_for.as_millis() as u64, "channel has gone quiet, declaring it offline");
                        feed.release().await;
                        self.terminate(
                            close::BAD_REQUEST,
                            &format!(
                                "{} streamer {} is offline",
                                key.platform.as_str().to_ascii_lowercase(),
                                key.streamer
                            ),
                        );
                        return;
                    }
                }
            } else {
                self.registry.reset_stale(&key);
                match serde_json::to_string(&fresh) {
                    Ok(json) => {
                        let delivered = self.hub.publish(&key, &json);
                        debug!(channel = %key, new = fresh.len(), delivered, "published chat entries");
                    },
                    Err(e) => warn!(channel = %key, error = %e, "failed to serialize chat entries"),
                }
                if let Some(newest) = entries.first() {
                    self.registry.update_fingerprint(&key, Fingerprint::from(newest));
                }
            }

            tokio::time::sleep(self.policy.poll_interval).await;
        }

        // Last subscriber left between iterations.
        debug!(channel = %key, "no subscribers left, releasing session");
        feed.release().await;
        self.terminate(close::BAD_REQUEST, "channel closed");
    }

    /// Terminal transition: claim the channel entry, close every remaining
    /// subscriber with the recorded code/reason, and leave nothing behind. A
    /// later subscribe to the same key starts a brand-new aggregator.
    fn terminate(&self, code: u16, reason: &str) {
        self.registry.set_state(&self.key, AggregatorState::Terminating);
        if let Some(removed) = self.registry.remove(&self.key)
            && !removed.is_empty()
        {
            let closed = removed.close_all(code, reason);
            info!(channel = %self.key, code, closed, reason, "channel terminated");
        }
    }
}
