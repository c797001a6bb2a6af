//! Per-connection chat loop.

use crate::core::readiness::ReadinessView;
use crate::core::relay::{RelayEnd, relay};
use crate::core::replies::ReplyCategory;
use crate::core::traits::{ChatHistoryService, ClientConnection, InferenceBackend};
use log::{error, info, warn};

/// Sent when the generation stream could not be opened.
pub const RELAY_FAILED_REPLY: &str = "Error processing request";

/// Serves one client until it disconnects.
///
/// Every inbound message is answered with either a canned reply or a relayed generation,
/// depending on the readiness observed when the message arrives.
pub async fn handle_connection<C>(
    connection: &mut C,
    readiness: &ReadinessView,
    backend: &dyn InferenceBackend,
    history: &dyn ChatHistoryService,
) where
    C: ClientConnection + ?Sized,
{
    while let Some(prompt) = connection.recv_text().await {
        info!("Received message: {prompt}");

        if history.save_user_message(prompt.clone()).await.is_err() {
            warn!("failed to save user message");
        }

        let category = if readiness.is_permanently_unavailable() {
            Some(ReplyCategory::Unavailable)
        } else if !readiness.is_ready() {
            Some(ReplyCategory::Waiting)
        } else {
            None
        };

        let model = match (category, readiness.model()) {
            (None, Some(model)) => model.name.clone(),
            (category, _) => {
                let reply = category.unwrap_or(ReplyCategory::Waiting).pick();
                let sent = connection.send_text(reply).await;
                if history.save_ai_message(reply.to_owned()).await.is_err() {
                    warn!("failed to save canned reply");
                }
                if sent.is_err() {
                    warn!("Client went away before the canned reply was sent");
                    break;
                }
                continue;
            }
        };

        match relay(backend, &model, &prompt, &mut *connection).await {
            Ok(outcome) => {
                let disconnected = outcome.end == RelayEnd::ClientDisconnected;
                if history.save_ai_message(outcome.full_text).await.is_err() {
                    warn!("failed to save relayed response");
                }
                if disconnected {
                    break;
                }
            }
            Err(e) => {
                error!("Error connecting to Ollama: {e}");
                if connection.send_text(RELAY_FAILED_REPLY).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("Chat connection closed");
}
