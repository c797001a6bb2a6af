//! HTTP client for the Ollama API.

use crate::core::error::UpstreamError;
use crate::core::readiness::ModelDescriptor;
use crate::core::traits::{ByteStream, GenerationRequest, GenerationResponse, InferenceBackend};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use log::debug;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
}

/// Talks to an Ollama server. No overall request timeout is set, since streamed generations
/// may legitimately run for minutes; probes pass their own per-request timeout.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, UpstreamError> {
        let url = self.url("/api/tags");
        debug!("Checking available models at: {url}");

        let response = ensure_success(self.client.get(&url).send().await?).await?;
        let body = response.bytes().await?;
        let tags: TagsResponse = serde_json::from_slice(&body)?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelDescriptor { name: m.name })
            .collect())
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        timeout: Duration,
    ) -> Result<GenerationResponse, UpstreamError> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .timeout(timeout)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<ByteStream, UpstreamError> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        Ok(response.bytes_stream().map_err(UpstreamError::from).boxed())
    }
}
