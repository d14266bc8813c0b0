use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use colored::Colorize;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::protocol::{self, Inbound, ServerEnvelope};
use super::state::RelayState;

/// Axum handler that upgrades an HTTP request to a WebSocket connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Manages a single WebSocket connection: registers it, pushes the current
/// history snapshot, then forwards every broadcast snapshot until the
/// connection closes or errors. Failures here never reach other connections.
async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let (client_id, label) = state.register_client().await;

    // Subscribe before reading the snapshot: an append racing with this
    // accept is then either already in the snapshot or delivered as a
    // broadcast right after it, never lost.
    let mut snapshot_rx = state.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Initial snapshot goes out before any broadcast forwarding starts.
    let initial = ServerEnvelope::history(state.snapshot().await);
    if let Ok(json) = serde_json::to_string(&initial) {
        if sender.send(Message::Text(json)).await.is_err() {
            state.deregister_client(client_id).await;
            return;
        }
    }

    // Task: forward broadcast snapshots → WebSocket client
    let mut send_task = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(messages) => {
                    let envelope = ServerEnvelope::history(messages);
                    if let Ok(json) = serde_json::to_string(&envelope) {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break; // client disconnected
                        }
                    }
                }
                // Missed snapshots are stale; the next one carries full state
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Task: read inbound frames (append/broadcast, ignore, or report)
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(raw) => handle_inbound(&recv_state, &label, &raw).await,
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(raw) => handle_inbound(&recv_state, &label, raw).await,
                    Err(_) => {
                        report_decode_error(&recv_state, &label, "binary frame is not valid UTF-8")
                            .await;
                    }
                },
                Message::Close(_) => break,
                // Ping/pong is answered by axum itself
                _ => {}
            }
        }
    });

    // Wait for either task to finish, then abort the other to prevent leaks
    tokio::select! {
        _ = &mut send_task => { recv_task.abort(); },
        _ = &mut recv_task => { send_task.abort(); },
    }

    state.deregister_client(client_id).await;
}

/// One inbound frame: structured decode, then either append-and-broadcast,
/// silently ignore, or report the decode failure locally.
async fn handle_inbound(state: &RelayState, label: &str, raw: &str) {
    state.log_inbound(label, raw);

    match protocol::decode_inbound(raw) {
        Ok(Inbound::Chat(text)) => {
            state.append_and_broadcast(text).await;
            state.metrics.write().await.messages_relayed += 1;
        }
        Ok(Inbound::Ignored) => {
            state.metrics.write().await.ignored_payloads += 1;
        }
        Err(e) => {
            report_decode_error(state, label, &e.to_string()).await;
        }
    }
}

/// Malformed payloads are recovered locally: logged and counted, no state
/// change, no broadcast, nothing surfaced to other connections.
async fn report_decode_error(state: &RelayState, label: &str, detail: &str) {
    eprintln!("{}", format!("Error parsing message from {label}: {detail}").red());
    state.log_error(&format!("parsing message from {label}: {detail}"));
    state.metrics.write().await.decode_errors += 1;
}
