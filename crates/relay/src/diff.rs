//! Poll-to-poll diffing.
//!
//! Repeated snapshots of the visible chat window are noisy: entries shift,
//! the window shortens, and nothing carries a stable ID. The fingerprint of
//! the most recently published entry is the anchor — everything above it in
//! a newest-first snapshot is new.

use chatspout_protocol::{ChatEntry, Fingerprint};

/// Return the not-yet-published entries from a newest-first snapshot,
/// reversed to chronological (oldest-first) order.
///
/// If the fingerprint does not appear anywhere in the snapshot, every entry
/// is considered new. O(n), with n bounded by the visible chat window.
pub fn diff_entries(entries: &[ChatEntry], fingerprint: Option<&Fingerprint>) -> Vec<ChatEntry> {
    let boundary = fingerprint
        .and_then(|fp| entries.iter().position(|e| fp.matches(e)))
        .unwrap_or(entries.len());
    entries[..boundary].iter().rev().cloned().collect()
}
