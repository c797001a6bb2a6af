//! Background warm-up of the upstream model.
//!
//! Runs once at startup: finds the first installed model, makes it generate a few tokens so its
//! weights are loaded, and publishes the outcome for the connection handlers.

use crate::core::error::UpstreamError;
use crate::core::readiness::{ModelDescriptor, ReadinessPublisher, ReadinessSink, ReadinessState};
use crate::core::traits::{GenerationRequest, InferenceBackend};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// How hard the generation probe tries before giving up on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub delay: Duration,
    pub prompt: String,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: 100,
            timeout: Duration::from_secs(20),
            delay: Duration::from_secs(2),
            prompt: "Hi".to_owned(),
        }
    }
}

/// Retry ceiling for the whole discover-then-probe cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub probe: ProbePolicy,
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self {
            max_retries: 100,
            retry_delay: Duration::from_secs(10),
            probe: ProbePolicy::default(),
        }
    }
}

/// Background task entry point: runs the warm-up and returns the state it settled in.
pub async fn background_task(
    backend: Arc<dyn InferenceBackend>,
    enabled: bool,
    policy: WarmupPolicy,
    mut publisher: ReadinessPublisher,
) -> ReadinessState {
    let state = run_readiness_check(backend.as_ref(), enabled, &policy, &mut publisher).await;
    match &state {
        ReadinessState::Ready(model) => info!("Ollama service is ready with model: {model}"),
        ReadinessState::Disabled => info!("Ollama is disabled, AI features are unavailable"),
        _ => warn!(
            "Ollama service not ready after {} attempts, AI features are unavailable",
            policy.max_retries
        ),
    }
    state
}

/// Drives the readiness state machine to a terminal state.
pub async fn run_readiness_check<B, S>(
    backend: &B,
    enabled: bool,
    policy: &WarmupPolicy,
    sink: &mut S,
) -> ReadinessState
where
    B: InferenceBackend + ?Sized,
    S: ReadinessSink,
{
    if !enabled {
        sink.publish(ReadinessState::Disabled);
        return ReadinessState::Disabled;
    }

    info!("Checking if the Ollama service is ready...");

    for attempt in 1..=policy.max_retries {
        if attempt > 1 {
            info!(
                "Retry attempt {attempt}/{} for model readiness check",
                policy.max_retries
            );
            sink.publish(ReadinessState::RetryAttempt(attempt));
            sleep(policy.retry_delay).await;
        }

        let model = match fetch_first_model(backend, sink).await {
            Ok(model) => model,
            Err(e) => {
                warn!("Attempt {attempt}: failed to get an available model: {e}");
                continue;
            }
        };

        sink.publish(ReadinessState::TestingGeneration);
        if let Err(e) = probe_generation(backend, &model.name, &policy.probe).await {
            warn!("Attempt {attempt}: model {} not ready for generation: {e}", model.name);
            sink.publish(probe_failure_state(&e));
            continue;
        }

        let ready = ReadinessState::Ready(model.name);
        sink.publish(ready.clone());
        return ready;
    }

    sink.publish(ReadinessState::Failed);
    ReadinessState::Failed
}

/// Lists the installed models and picks the first one.
pub async fn fetch_first_model<B, S>(
    backend: &B,
    sink: &mut S,
) -> Result<ModelDescriptor, UpstreamError>
where
    B: InferenceBackend + ?Sized,
    S: ReadinessSink,
{
    sink.publish(ReadinessState::CheckingModels);

    let result = backend
        .list_models()
        .await
        .and_then(|models| models.into_iter().next().ok_or(UpstreamError::NoModels));

    match result {
        Ok(model) => {
            info!("Found available model: {}", model.name);
            sink.publish(ReadinessState::ModelFound(model.name.clone()));
            Ok(model)
        }
        Err(e) => {
            sink.publish(fetch_failure_state(&e));
            Err(e)
        }
    }
}

/// Asks `model` to generate, up to `policy.attempts` times with `policy.delay` in between.
///
/// Every failure is retried; the error of the last attempt is returned once they run out.
pub async fn probe_generation<B>(
    backend: &B,
    model: &str,
    policy: &ProbePolicy,
) -> Result<(), UpstreamError>
where
    B: InferenceBackend + ?Sized,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = UpstreamError::NoContent;

    for attempt in 1..=attempts {
        if attempt > 1 {
            sleep(policy.delay).await;
        }
        debug!(
            "Generation probe {attempt}/{attempts} for {model} (timeout: {:?})",
            policy.timeout
        );

        let request = GenerationRequest {
            model: model.to_owned(),
            prompt: policy.prompt.clone(),
            stream: false,
        };

        match backend.generate(request, policy.timeout).await {
            Ok(response) if response.response.is_some() => {
                info!("Model generation test successful on attempt {attempt}");
                return Ok(());
            }
            Ok(_) => {
                warn!("Generation probe {attempt}: no response content");
                last_error = UpstreamError::NoContent;
            }
            Err(e) => {
                warn!("Generation probe {attempt}: {e}");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

fn fetch_failure_state(error: &UpstreamError) -> ReadinessState {
    match error {
        UpstreamError::Transport(_) => ReadinessState::ErrorConnecting,
        UpstreamError::Status { .. } => ReadinessState::ErrorApi,
        UpstreamError::Decode(_) => ReadinessState::ErrorParsing,
        UpstreamError::NoModels | UpstreamError::NoContent => ReadinessState::NoModelsAvailable,
    }
}

fn probe_failure_state(error: &UpstreamError) -> ReadinessState {
    match error {
        UpstreamError::Decode(_) => ReadinessState::ErrorParsingResponse,
        UpstreamError::NoContent => ReadinessState::ErrorNoResponseContent,
        _ => ReadinessState::ErrorGeneration,
    }
}
