//! In-process fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_ollama_chat_api::core::error::{ClientDisconnected, UpstreamError};
use tokio_ollama_chat_api::core::readiness::{
    ModelDescriptor, ReadinessPublisher, ReadinessSink, ReadinessState,
};
use tokio_ollama_chat_api::core::traits::{
    ByteStream, ChatHistoryService, ClientConnection, GenerationRequest, GenerationResponse,
    InferenceBackend, TextSink,
};
use tokio_ollama_chat_api::infrastructure::entities::{ChatMessage, Sender};
use uuid::Uuid;

type StreamScript = Result<Vec<Result<Bytes, UpstreamError>>, UpstreamError>;

/// Upstream whose answers are scripted per call. Unscripted calls fail with a transport error.
#[derive(Default)]
pub struct FakeBackend {
    models: Mutex<VecDeque<Result<Vec<ModelDescriptor>, UpstreamError>>>,
    probes: Mutex<VecDeque<Result<GenerationResponse, UpstreamError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    pub list_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

fn unscripted() -> UpstreamError {
    UpstreamError::Transport("connection refused".to_string())
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(self, names: &[&str]) -> Self {
        let models = names
            .iter()
            .map(|name| ModelDescriptor {
                name: name.to_string(),
            })
            .collect();
        self.models.lock().unwrap().push_back(Ok(models));
        self
    }

    pub fn models_error(self, error: UpstreamError) -> Self {
        self.models.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn probe_ok(self) -> Self {
        self.probe(Ok(GenerationResponse {
            response: Some("Hello!".to_string()),
            done: true,
        }))
    }

    pub fn probe_empty(self) -> Self {
        self.probe(Ok(GenerationResponse::default()))
    }

    pub fn probe_error(self, error: UpstreamError) -> Self {
        self.probe(Err(error))
    }

    fn probe(self, result: Result<GenerationResponse, UpstreamError>) -> Self {
        self.probes.lock().unwrap().push_back(result);
        self
    }

    /// Scripts a streaming body made of the given lines, each terminated by a newline.
    pub fn stream_lines(self, lines: &[&str]) -> Self {
        let body: String = lines.iter().map(|line| format!("{line}\n")).collect();
        self.stream_parts(vec![Ok(Bytes::from(body))])
    }

    pub fn stream_parts(self, parts: Vec<Result<Bytes, UpstreamError>>) -> Self {
        self.streams.lock().unwrap().push_back(Ok(parts));
        self
    }

    pub fn stream_error(self, error: UpstreamError) -> Self {
        self.streams.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, UpstreamError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.models
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()))
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        _timeout: Duration,
    ) -> Result<GenerationResponse, UpstreamError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.probes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()))
    }

    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<ByteStream, UpstreamError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let parts = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()))?;
        Ok(stream::iter(parts).boxed())
    }
}

/// Client connection fed from a fixed list of inbound messages.
pub struct ScriptedConnection {
    inbound: VecDeque<String>,
    pub sent: Vec<String>,
    /// Number of writes accepted before the client "disconnects".
    accept: Option<usize>,
    /// Time the client takes before each inbound message.
    pause: Option<Duration>,
}

impl ScriptedConnection {
    pub fn new(inbound: &[&str]) -> Self {
        Self {
            inbound: inbound.iter().map(|m| m.to_string()).collect(),
            sent: Vec::new(),
            accept: None,
            pause: None,
        }
    }

    pub fn paced(mut self, pause: Duration) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn disconnect_after(mut self, writes: usize) -> Self {
        self.accept = Some(writes);
        self
    }

    pub fn unread(&self) -> usize {
        self.inbound.len()
    }
}

#[async_trait]
impl TextSink for ScriptedConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientDisconnected> {
        if self.accept.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(ClientDisconnected);
        }
        self.sent.push(text.to_string());
        Ok(())
    }
}

#[async_trait]
impl ClientConnection for ScriptedConnection {
    async fn recv_text(&mut self) -> Option<String> {
        if let Some(pause) = self.pause {
            tokio::time::sleep(pause).await;
        }
        self.inbound.pop_front()
    }
}

/// History service keeping everything in memory.
#[derive(Default)]
pub struct RecordingHistory {
    pub messages: Mutex<Vec<(Sender, String)>>,
}

impl RecordingHistory {
    pub fn entries(&self) -> Vec<(Sender, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatHistoryService for RecordingHistory {
    async fn list_history(&self) -> Vec<ChatMessage> {
        self.entries()
            .into_iter()
            .map(|(sender, message)| ChatMessage {
                id: Uuid::new_v4(),
                sender,
                message,
                created_at: Utc::now(),
            })
            .collect()
    }

    async fn save_message(&self, sender: Sender, message: String) -> Result<ChatMessage, ()> {
        self.messages.lock().unwrap().push((sender, message.clone()));
        Ok(ChatMessage {
            id: Uuid::new_v4(),
            sender,
            message,
            created_at: Utc::now(),
        })
    }
}

/// Forwards transitions to a real publisher and remembers them.
pub struct RecordingSink {
    pub states: Vec<ReadinessState>,
    publisher: ReadinessPublisher,
}

impl RecordingSink {
    pub fn new(publisher: ReadinessPublisher) -> Self {
        Self {
            states: Vec::new(),
            publisher,
        }
    }

    pub fn publisher(&mut self) -> &mut ReadinessPublisher {
        &mut self.publisher
    }
}

impl ReadinessSink for RecordingSink {
    fn publish(&mut self, state: ReadinessState) {
        self.states.push(state.clone());
        self.publisher.publish(state);
    }
}
