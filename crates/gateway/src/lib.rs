//! HTTP/WebSocket surface of the relay.
//!
//! Routes: `/health`, `/health/downstream`, `/{platform}/{streamer}/profile`
//! and `/{platform}/{streamer}/chat` (the subscription endpoint). Chat and
//! profile handlers reach the browser only through the `ChatSource` and
//! `ProfileSource` seams, so tests run the full router against fakes.

pub mod server;
pub mod state;
pub mod ws;

pub use {
    server::build_app,
    state::{AppState, BrowserlessSource, ProfileSource},
};
