//! Channel registry: the shared table behind both the subscribe/unsubscribe
//! surface and the aggregator's bookkeeping.
//!
//! The single-flight guarantee lives here: `subscribe` decides "first
//! subscriber" atomically as part of the insert itself, so two concurrent
//! first-subscribers can never both spawn an aggregator. The subscriber set
//! doubles as the counter the aggregator polls, so hub membership and
//! registry count can never disagree.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    chatspout_protocol::{ChannelKey, Fingerprint},
    dashmap::{DashMap, mapref::entry::Entry},
    tokio::sync::mpsc::UnboundedSender,
    tracing::debug,
};

/// Opaque connection identity, derived from the remote address upstream.
pub type ClientId = String;

/// Lifecycle of a channel's aggregator task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Idle,
    Starting,
    Running,
    Terminating,
    Terminated,
}

/// Instruction pushed to a connection's write loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Deliver a pre-serialized JSON frame.
    Frame(String),
    /// Close the connection with the given code and reason.
    Close { code: u16, reason: String },
}

pub(crate) struct ChannelEntry {
    subscribers: HashMap<ClientId, UnboundedSender<Directive>>,
    state: AggregatorState,
    fingerprint: Option<Fingerprint>,
    stale_polls: u32,
    stale_since: Option<Instant>,
}

impl ChannelEntry {
    pub(crate) fn subscribers(&self) -> &HashMap<ClientId, UnboundedSender<Directive>> {
        &self.subscribers
    }

    fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            state: AggregatorState::Idle,
            fingerprint: None,
            stale_polls: 0,
            stale_since: None,
        }
    }
}

pub(crate) type ChannelTable = DashMap<ChannelKey, ChannelEntry>;

/// Channel identity → aggregator state + subscriber set.
#[derive(Clone)]
pub struct ChannelRegistry {
    pub(crate) table: Arc<ChannelTable>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            table: Arc::new(DashMap::new()),
        }
    }

    /// The fan-out facade sharing this registry's table.
    pub fn hub(&self) -> crate::hub::SubscriptionHub {
        crate::hub::SubscriptionHub {
            table: Arc::clone(&self.table),
        }
    }

    /// Register a connection under `key`. Returns `true` iff this call
    /// created the channel entry, i.e. the caller is the one subscriber
    /// responsible for spawning the aggregator.
    pub fn subscribe(
        &self,
        key: &ChannelKey,
        client_id: ClientId,
        sender: UnboundedSender<Directive>,
    ) -> bool {
        match self.table.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().subscribers.insert(client_id, sender);
                false
            },
            Entry::Vacant(vacant) => {
                let mut entry = ChannelEntry::new();
                entry.subscribers.insert(client_id, sender);
                vacant.insert(entry);
                true
            },
        }
    }

    /// Drop a connection's membership. The channel entry itself stays until
    /// the owning aggregator removes it.
    pub fn unsubscribe(&self, key: &ChannelKey, client_id: &str) {
        if let Some(mut entry) = self.table.get_mut(key) {
            entry.subscribers.remove(client_id);
        }
    }

    /// Number of connections currently subscribed to `key`. This is the
    /// counter the aggregator's run loop polls.
    /// Live connections across every channel.
    pub fn total_subscribers(&self) -> usize {
        self.table
            .iter()
            .map(|entry| entry.subscribers.len())
            .sum()
    }

    pub fn subscriber_count(&self, key: &ChannelKey) -> usize {
        self.table.get(key).map_or(0, |e| e.subscribers.len())
    }

    pub fn state(&self, key: &ChannelKey) -> Option<AggregatorState> {
        self.table.get(key).map(|e| e.state)
    }

    pub fn set_state(&self, key: &ChannelKey, state: AggregatorState) {
        if let Some(mut entry) = self.table.get_mut(key) {
            entry.state = state;
        }
    }

    pub fn fingerprint(&self, key: &ChannelKey) -> Option<Fingerprint> {
        self.table.get(key).and_then(|e| e.fingerprint.clone())
    }

    pub fn update_fingerprint(&self, key: &ChannelKey, fingerprint: Fingerprint) {
        if let Some(mut entry) = self.table.get_mut(key) {
            entry.fingerprint = Some(fingerprint);
        }
    }

    /// Record one poll cycle that produced no new entries. Returns the
    /// consecutive-empty count and how long the channel has been stale.
    pub fn mark_stale(&self, key: &ChannelKey, now: Instant) -> (u32, Duration) {
        match self.table.get_mut(key) {
            Some(mut entry) => {
                entry.stale_polls += 1;
                let since = *entry.stale_since.get_or_insert(now);
                (entry.stale_polls, now.duration_since(since))
            },
            None => (0, Duration::ZERO),
        }
    }

    /// A poll produced new entries; the channel is live again.
    pub fn reset_stale(&self, key: &ChannelKey) {
        if let Some(mut entry) = self.table.get_mut(key) {
            entry.stale_polls = 0;
            entry.stale_since = None;
        }
    }

    /// Consecutive empty polls so far.
    pub fn stale_polls(&self, key: &ChannelKey) -> u32 {
        self.table.get(key).map_or(0, |e| e.stale_polls)
    }

    /// Erase the channel, atomically claiming every remaining subscriber.
    ///
    /// Only the owning aggregator calls this, at teardown. Claiming the
    /// members in the same operation closes the race with a late subscribe:
    /// a connection that slipped in after the aggregator's last count check
    /// is closed along with the channel, while a subscribe landing after the
    /// removal creates a fresh entry and spawns a fresh aggregator.
    pub fn remove(&self, key: &ChannelKey) -> Option<RemovedChannel> {
        let (_, entry) = self.table.remove(key)?;
        debug!(channel = %key, subscribers = entry.subscribers.len(), "channel removed");
        Some(RemovedChannel {
            subscribers: entry.subscribers.into_iter().collect(),
        })
    }
}

/// The final members of a removed channel, to be closed by the aggregator.
pub struct RemovedChannel {
    subscribers: Vec<(ClientId, UnboundedSender<Directive>)>,
}

impl RemovedChannel {
    /// Close every claimed connection with the recorded reason. Returns how
    /// many close directives were delivered.
    pub fn close_all(self, code: u16, reason: &str) -> usize {
        let mut delivered = 0;
        for (_, sender) in self.subscribers {
            if sender
                .send(Directive::Close {
                    code,
                    reason: reason.to_string(),
                })
                .is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {chatspout_protocol::Platform, tokio::sync::mpsc};

    use super::*;

    fn key() -> ChannelKey {
        ChannelKey::new(Platform::Kick, "streamer")
    }

    fn sender() -> UnboundedSender<Directive> {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn first_subscriber_is_flagged_once() {
        let registry = ChannelRegistry::new();
        assert!(registry.subscribe(&key(), "a".into(), sender()));
        assert!(!registry.subscribe(&key(), "b".into(), sender()));
        assert_eq!(registry.subscriber_count(&key()), 2);
    }

    #[test]
    fn unsubscribe_never_goes_below_zero() {
        let registry = ChannelRegistry::new();
        registry.subscribe(&key(), "a".into(), sender());
        registry.unsubscribe(&key(), "a");
        registry.unsubscribe(&key(), "a");
        registry.unsubscribe(&key(), "ghost");
        assert_eq!(registry.subscriber_count(&key()), 0);
    }

    #[test]
    fn mark_stale_tracks_count_and_duration() {
        let registry = ChannelRegistry::new();
        registry.subscribe(&key(), "a".into(), sender());

        let t0 = Instant::now();
        let (polls, since) = registry.mark_stale(&key(), t0);
        assert_eq!(polls, 1);
        assert_eq!(since, Duration::ZERO);

        let (polls, since) = registry.mark_stale(&key(), t0 + Duration::from_millis(300));
        assert_eq!(polls, 2);
        assert_eq!(since, Duration::from_millis(300));

        registry.reset_stale(&key());
        assert_eq!(registry.stale_polls(&key()), 0);
        let (polls, since) = registry.mark_stale(&key(), t0 + Duration::from_secs(2));
        assert_eq!(polls, 1);
        assert_eq!(since, Duration::ZERO);
    }

    #[test]
    fn remove_claims_remaining_subscribers() {
        let registry = ChannelRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.subscribe(&key(), "late".into(), tx);

        let removed = registry.remove(&key()).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.close_all(4001, "gone"), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            Directive::Close {
                code: 4001,
                reason: "gone".into()
            }
        );

        // A subscribe after removal is a fresh first subscriber.
        assert!(registry.subscribe(&key(), "next".into(), sender()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_subscribes_elect_exactly_one_first() {
        let registry = ChannelRegistry::new();
        let mut handles = Vec::new();
        for i in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.subscribe(&key(), format!("client-{i}"), sender())
            }));
        }
        let mut firsts = 0;
        for handle in handles {
            if handle.await.unwrap() {
                firsts += 1;
            }
        }
        assert_eq!(firsts, 1);
        assert_eq!(registry.subscriber_count(&key()), 64);
    }
}
