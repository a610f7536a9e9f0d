//! Per-connection WebSocket controller.
//!
//! The protocol is push-only: subscribers receive JSON frames and close
//! frames, and must never send. Everything a connection receives comes
//! through its [`Directive`] channel, fed by the channel's aggregator.

use std::{net::SocketAddr, sync::Arc};

use {
    axum::extract::ws::{CloseFrame, Message, WebSocket},
    base64::{Engine as _, engine::general_purpose::STANDARD},
    futures::{SinkExt, stream::StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info},
};

use {
    chatspout_protocol::{ChannelKey, close},
    chatspout_relay::{Aggregator, Directive},
};

use crate::state::AppState;

/// Handle one subscriber through its full lifecycle: subscribe (spawning
/// the channel's aggregator when first), relay directives, unsubscribe.
pub async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    key: ChannelKey,
    remote_addr: SocketAddr,
) {
    // The port keeps two connections from one host distinct.
    let client_id = STANDARD.encode(remote_addr.to_string());
    info!(channel = %key, client_id = %client_id, "ws: new subscriber");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Directive>();

    // Atomic insert-if-absent: exactly one subscriber sees `first` and owns
    // spawning the aggregator, no matter how many connect at once.
    let first = state.registry.subscribe(&key, client_id.clone(), tx);
    if first {
        Aggregator {
            registry: state.registry.clone(),
            hub: state.hub.clone(),
            source: Arc::clone(&state.source),
            key: key.clone(),
            policy: state.policy_for(key.platform),
        }
        .spawn();
    }

    // Write loop: drains directives into the socket. A close directive is
    // terminal.
    let write_key = key.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(directive) = rx.recv().await {
            match directive {
                Directive::Frame(frame) => {
                    if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                        debug!(channel = %write_key, "ws: write loop closed");
                        break;
                    }
                },
                Directive::Close { code, reason } => {
                    let _ = ws_tx
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                },
            }
        }
    });

    // Read loop: the only acceptable inbound traffic is the close handshake.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(_) | Message::Binary(_)) => {
                debug!(channel = %key, client_id = %client_id, "ws: inbound frame prohibited");
                state.hub.close_client(
                    &key,
                    &client_id,
                    close::MESSAGE_PROHIBITED,
                    "Message Prohibited",
                );
                break;
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(channel = %key, client_id = %client_id, error = %err, "ws: read error");
                break;
            },
        }
    }

    // Unsubscribing drops the registry's sender, which ends the write loop
    // once any pending close frame has flushed.
    state.registry.unsubscribe(&key, &client_id);
    info!(channel = %key, client_id = %client_id, "ws: subscriber gone");

    let _ = write_handle.await;
}
