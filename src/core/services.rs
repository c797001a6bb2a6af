//! Implementations for the service the app needs.
//!

use crate::core::traits::ChatHistoryService;
use crate::infrastructure::entities::{ChatMessage, Sender};
use crate::infrastructure::traits::ChatHistoryRepository;
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::debug;
use uuid::Uuid;

#[injectable(ChatHistoryService)]
pub struct MyChatHistoryService {
    repo: Ref<dyn ChatHistoryRepository>,
}

impl MyChatHistoryService {
    pub fn new(repo: Ref<dyn ChatHistoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ChatHistoryService for MyChatHistoryService {
    async fn list_history(&self) -> Vec<ChatMessage> {
        self.repo.list_messages().await.unwrap_or(Vec::new())
    }

    async fn save_message(&self, sender: Sender, message: String) -> Result<ChatMessage, ()> {
        debug!("saving {sender:?} message to database: {message}");
        self.repo
            .create_message(ChatMessage {
                id: Uuid::new_v4(),
                sender,
                message,
                created_at: Utc::now(),
            })
            .await
    }
}
