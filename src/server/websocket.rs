//! WebSocket handler for live updates

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::poll::encode_snapshot;
use super::http::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle one client: an immediate snapshot for it alone, then every
/// broadcast snapshot until either side goes away.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the first snapshot so no broadcast is missed
    let mut rx = state.update_tx.subscribe();
    tracing::info!(clients = state.update_tx.receiver_count(), "client connected");

    let mut send_task = tokio::spawn(async move {
        match encode_snapshot(&state.collector).await {
            Ok(frame) => {
                if sender.send(Message::Text(frame)).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::error!("initial snapshot failed: {}", e),
        }

        loop {
            match rx.recv().await {
                Ok(frame) => {
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "slow client skipped snapshots");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Clients never send anything meaningful; drain until close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    tracing::info!("client disconnected");
}
