//! WebSocket session handler.
//!
//! `GET /ws` upgrades to a persistent session. Outbound frames flow
//! through a per-connection unbounded channel registered with the
//! ConnectionRegistry; a spawned forward task drains it into the socket
//! sink. Inbound frames are processed strictly in arrival order by this
//! task, so a session's frames never interleave with each other.
//!
//! The first text frame is the authentication handshake. A failed
//! handshake answers with an error frame and closes the connection; any
//! later failure is answered by the orchestrator without closing.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use presale_types::frame::ServerFrame;

use crate::state::AppState;

/// GET /ws -- upgrade to a chat session.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn handle_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let handle = state.registry.register(tx);
    tracing::debug!(session = %handle, "session connected");

    // Drains until the registry entry (and with it the sender) is dropped.
    let forward = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut authenticated = false;
    while let Some(received) = stream.next().await {
        match received {
            Ok(Message::Text(text)) => {
                if authenticated {
                    state.orchestrator.handle_frame(handle, &text).await;
                } else {
                    match state.orchestrator.authenticate(handle, &text).await {
                        Ok(()) => authenticated = true,
                        Err(err) => {
                            tracing::info!(session = %handle, error = %err, "authentication failed");
                            state
                                .registry
                                .send(handle, &ServerFrame::Error { error: err.to_string() });
                            break;
                        }
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            // Binary and ping/pong protocol frames are ignored.
            Ok(_) => {}
        }
    }

    state.registry.deregister(handle);
    let _ = forward.await;
    tracing::debug!(session = %handle, "session closed");
}
