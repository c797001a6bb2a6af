//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::ChatMessage;
use crate::infrastructure::traits::ChatHistoryRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::error;

#[injectable(ChatHistoryRepository)]
pub struct DbChatHistoryRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbChatHistoryRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ChatHistoryRepository for DbChatHistoryRepository {
    async fn list_messages(&self) -> Result<Vec<ChatMessage>, ()> {
        sqlx::query_as("SELECT id, sender, message, created_at FROM chat_history ORDER BY seq ASC")
            .fetch_all(&**self.connection)
            .await
            .map_err(|e| error!("Error fetching chat history: {e}"))
    }

    async fn create_message(&self, message: ChatMessage) -> Result<ChatMessage, ()> {
        sqlx::query_as(
            "INSERT INTO chat_history (id, sender, message, created_at) VALUES (?, ?, ?, ?) RETURNING id, sender, message, created_at",
        )
        .bind(message.id)
        .bind(message.sender)
        .bind(message.message)
        .bind(message.created_at)
        .fetch_one(&**self.connection)
        .await
        .map_err(|e| error!("Error saving message: {e}"))
    }
}
