use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::session::{SessionServer, SignalingHandler};

pub async fn handle_session_websocket(websocket: WebSocket, server: Arc<SessionServer>) {
    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let mut handler = SignalingHandler::new(server, tx).await;
    tracing::info!(conn_id = %handler.conn_id(), "Session WebSocket connection established");

    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) if message.is_close() => break,
            Ok(message) => {
                // Binary and ping frames carry no requests.
                if let Ok(text) = message.to_str() {
                    handler.handle_text(text).await;
                }
            }
            Err(e) => {
                tracing::error!(conn_id = %handler.conn_id(), error = %e, "WebSocket error");
                break;
            }
        }
    }

    handler.cleanup().await;
    sender_task.abort();
    tracing::info!(conn_id = %handler.conn_id(), "Session WebSocket connection closed");
}
