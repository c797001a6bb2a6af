//! DI "Interfaces"

use crate::core::error::{ClientDisconnected, UpstreamError};
use crate::core::readiness::ModelDescriptor;
use crate::infrastructure::entities;
use crate::infrastructure::entities::Sender;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait ChatHistoryService: Send + Sync {
    /// Lists the whole chat history, oldest first.
    async fn list_history(&self) -> Vec<entities::ChatMessage>;

    /// Stores a message from the given sender.
    ///
    /// The helper functions `save_X_message` should be used instead for clarity.
    async fn save_message(
        &self,
        sender: Sender,
        message: String,
    ) -> Result<entities::ChatMessage, ()>;

    /// Stores a prompt typed by the user.
    async fn save_user_message(&self, message: String) -> Result<entities::ChatMessage, ()> {
        self.save_message(Sender::User, message).await
    }

    /// Stores anything the AI side said: relayed text or a canned reply.
    async fn save_ai_message(&self, message: String) -> Result<entities::ChatMessage, ()> {
        self.save_message(Sender::Ai, message).await
    }
}

/// Body of a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

/// Non-streaming generation result. `response` is `None` when the model produced nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
}

/// One record of a streaming generation body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "response", default)]
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// The upstream inference service.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Installed models in upstream order.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, UpstreamError>;

    /// One non-streaming generation call bounded by `timeout`.
    async fn generate(
        &self,
        request: GenerationRequest,
        timeout: Duration,
    ) -> Result<GenerationResponse, UpstreamError>;

    /// Opens a streaming generation call and returns the raw newline-delimited body.
    async fn generate_stream(&self, request: GenerationRequest)
    -> Result<ByteStream, UpstreamError>;
}

/// Where relayed text goes.
#[async_trait]
pub trait TextSink: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientDisconnected>;
}

/// A client connection carrying plain-text messages both ways.
#[async_trait]
pub trait ClientConnection: TextSink {
    /// Next inbound message, or `None` once the connection is closed or broken.
    async fn recv_text(&mut self) -> Option<String>;
}
