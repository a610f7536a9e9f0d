//! Subscription hub: best-effort fan-out of published frames to every
//! connection subscribed to a channel.
//!
//! Delivery is fire-and-forget. A send fails only when the connection's
//! write loop has already gone away; buffering and slow-consumer policy are
//! the transport's concern, not tracked here.

use std::sync::Arc;

use {chatspout_protocol::ChannelKey, tracing::trace};

use crate::registry::{ChannelTable, Directive};

/// Fan-out facade over the shared channel table.
#[derive(Clone)]
pub struct SubscriptionHub {
    pub(crate) table: Arc<ChannelTable>,
}

impl SubscriptionHub {
    /// Deliver one pre-serialized frame to every subscriber of `key`.
    /// Returns how many write loops accepted it.
    pub fn publish(&self, key: &ChannelKey, payload: &str) -> usize {
        let Some(entry) = self.table.get(key) else {
            return 0;
        };
        let mut delivered = 0;
        for sender in entry.subscribers().values() {
            if sender.send(Directive::Frame(payload.to_string())).is_ok() {
                delivered += 1;
            }
        }
        trace!(channel = %key, delivered, "published frame");
        delivered
    }

    /// Close a single connection without touching the rest of the channel.
    /// Used for per-connection protocol violations.
    pub fn close_client(&self, key: &ChannelKey, client_id: &str, code: u16, reason: &str) {
        if let Some(entry) = self.table.get(key)
            && let Some(sender) = entry.subscribers().get(client_id)
        {
            let _ = sender.send(Directive::Close {
                code,
                reason: reason.to_string(),
            });
        }
    }

    /// Membership size for `key` — by construction the same counter the
    /// channel registry reports.
    pub fn subscriber_count(&self, key: &ChannelKey) -> usize {
        self.table.get(key).map_or(0, |e| e.subscribers().len())
    }
}
