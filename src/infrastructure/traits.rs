//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use async_trait::async_trait;

#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    async fn list_messages(&self) -> Result<Vec<entities::ChatMessage>, ()>;

    async fn create_message(
        &self,
        message: entities::ChatMessage,
    ) -> Result<entities::ChatMessage, ()>;
}
