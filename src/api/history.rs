//! Chat history endpoint

use crate::core::traits::ChatHistoryService;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/api/history", get(chat_history))
}

async fn chat_history(
    Inject(history): Inject<dyn ChatHistoryService>,
) -> Json<Vec<schemas::ChatMessage>> {
    let messages = history.list_history().await;
    Json(messages.into_iter().map(schemas::ChatMessage::from).collect())
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Sender {
        User,
        #[serde(rename = "AI")]
        Ai,
    }

    impl From<entities::Sender> for Sender {
        fn from(sender: entities::Sender) -> Self {
            match sender {
                entities::Sender::User => Sender::User,
                entities::Sender::Ai => Sender::Ai,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ChatMessage {
        pub id: Uuid,
        pub sender: Sender,
        pub message: String,
        pub timestamp: DateTime<Utc>,
    }

    impl From<entities::ChatMessage> for ChatMessage {
        fn from(message: entities::ChatMessage) -> Self {
            ChatMessage {
                id: message.id,
                sender: message.sender.into(),
                message: message.message,
                timestamp: message.created_at,
            }
        }
    }
}
