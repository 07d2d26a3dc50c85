pub mod socket;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::StreamExt;
use std::sync::Arc;

use crate::connection::Connection;
use crate::state::AppState;
use socket::{WsSink, WsSource};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::debug!("WebSocket connection request");

    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Register the socket with the hub and wait for it to shut down
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();

    let connection = match Connection::open(
        &state.hub,
        WsSource::new(receiver),
        WsSink::new(sender),
        state.config.outbound_capacity,
    )
    .await
    {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Failed to register WebSocket: {}", e);
            return;
        }
    };

    tracing::info!(connection = %connection.id(), "WebSocket connected");
    connection.closed().await;
}
