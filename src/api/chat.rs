//! Chat WebSocket endpoint

use crate::api::AppState;
use crate::core::connection::handle_connection;
use crate::core::error::ClientDisconnected;
use crate::core::traits::{ChatHistoryService, ClientConnection, TextSink};
use async_trait::async_trait;
use axum::Extension;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use di_axum::Inject;
use log::{info, warn};

pub async fn chat_socket(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
    Inject(history): Inject<dyn ChatHistoryService>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        info!("WebSocket connected");
        let mut connection = WsConnection { socket };
        handle_connection(
            &mut connection,
            &state.readiness,
            state.backend.as_ref(),
            history.as_ref(),
        )
        .await;
    })
}

/// A WebSocket seen as a plain-text message pipe.
pub struct WsConnection {
    socket: WebSocket,
}

#[async_trait]
impl TextSink for WsConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientDisconnected> {
        self.socket
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| {
                warn!("Error sending message: {e}");
                ClientDisconnected
            })
    }
}

#[async_trait]
impl ClientConnection for WsConnection {
    async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.socket.recv().await? {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(text),
                    Err(_) => warn!("Ignoring non UTF-8 binary message"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    warn!("WebSocket read error: {e}");
                    return None;
                }
            }
        }
    }
}
