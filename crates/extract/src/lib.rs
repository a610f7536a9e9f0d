//! Headless-browser chat extraction.
//!
//! Streaming platforms ship chat only as live DOM, so this crate drives a
//! shared Chromium process over CDP: one page per channel, a per-platform
//! script that reads the visible chat rows, and a normalization pass that
//! turns raw rows into wire-ready entries. The relay consumes it through
//! the [`ChatSource`](chatspout_relay::ChatSource) boundary.

mod detect;
mod engine;
mod error;
mod profile;
mod script;
mod session;

pub use {
    detect::{detect_browser, install_instructions},
    engine::ExtractEngine,
    error::ExtractError,
    script::{chat_script, parse_rows},
    session::PageSession,
};
