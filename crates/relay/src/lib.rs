//! Channel aggregation and fan-out engine.
//!
//! One aggregator task per active channel, shared by every subscriber of
//! that channel:
//!
//! 1. A connection subscribes through the [`registry::ChannelRegistry`];
//!    the first subscriber of a channel spawns its
//!    [`aggregator::Aggregator`] (single-flight, decided atomically inside
//!    the subscribe).
//! 2. The aggregator acquires an extraction session through the
//!    [`source::ChatSource`] boundary, polls it, and diffs snapshots with
//!    [`diff::diff_entries`].
//! 3. New entries fan out through the [`hub::SubscriptionHub`] to every
//!    subscriber's write loop.
//! 4. Failure, staleness, or a subscriber count of zero tears the channel
//!    down and removes it from the registry.
//!
//! State is entirely in-memory and ephemeral; nothing is persisted or
//! replayed.

pub mod aggregator;
pub mod diff;
pub mod hub;
pub mod registry;
pub mod source;

pub use {
    aggregator::{Aggregator, AggregatorPolicy},
    diff::diff_entries,
    hub::SubscriptionHub,
    registry::{AggregatorState, ChannelRegistry, ClientId, Directive, RemovedChannel},
    source::{ChatFeed, ChatSource, SourceError},
};
