//! Shared readiness state of the upstream model.
//!
//! The state has exactly one writer, the [`ReadinessPublisher`], which is moved into the
//! background warm-up task. Connection handlers hold cheap [`ReadinessView`] clones and poll
//! two atomic flags per inbound message; the full status is only read by the status endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

/// Phase of the warm-up procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    Initializing,
    CheckingModels,
    ModelFound(String),
    TestingGeneration,
    RetryAttempt(u32),
    Ready(String),
    Disabled,
    Failed,
    ErrorConnecting,
    ErrorApi,
    ErrorParsing,
    NoModelsAvailable,
    ErrorGeneration,
    ErrorParsingResponse,
    ErrorNoResponseContent,
}

impl ReadinessState {
    /// Stable snake_case name, as reported by the status endpoint.
    pub fn tag(&self) -> &'static str {
        match self {
            ReadinessState::Initializing => "initializing",
            ReadinessState::CheckingModels => "checking_models",
            ReadinessState::ModelFound(_) => "model_found",
            ReadinessState::TestingGeneration => "testing_generation",
            ReadinessState::RetryAttempt(_) => "retry_attempt",
            ReadinessState::Ready(_) => "ready",
            ReadinessState::Disabled => "disabled",
            ReadinessState::Failed => "failed",
            ReadinessState::ErrorConnecting => "error_connecting",
            ReadinessState::ErrorApi => "error_api",
            ReadinessState::ErrorParsing => "error_parsing",
            ReadinessState::NoModelsAvailable => "no_models",
            ReadinessState::ErrorGeneration => "error_generation",
            ReadinessState::ErrorParsingResponse => "error_parsing_response",
            ReadinessState::ErrorNoResponseContent => "error_no_response",
        }
    }

    /// `Ready`, `Disabled` and `Failed` end the warm-up; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReadinessState::Ready(_) | ReadinessState::Disabled | ReadinessState::Failed
        )
    }
}

/// The model picked from the upstream listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
}

/// Value carried by the watch channel: the state plus the last model name seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub state: ReadinessState,
    pub model: Option<String>,
}

/// Read-only snapshot served to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub ready: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    pub model: String,
}

/// Anything the warm-up state machine can report its transitions to.
pub trait ReadinessSink: Send {
    fn publish(&mut self, state: ReadinessState);
}

struct Flags {
    ready: AtomicBool,
    permanently_unavailable: AtomicBool,
    model: OnceLock<ModelDescriptor>,
}

/// Creates the single writer and a first reader for a fresh `Initializing` state.
pub fn readiness_channel() -> (ReadinessPublisher, ReadinessView) {
    let flags = Arc::new(Flags {
        ready: AtomicBool::new(false),
        permanently_unavailable: AtomicBool::new(false),
        model: OnceLock::new(),
    });
    let (sender, receiver) = watch::channel(Status {
        state: ReadinessState::Initializing,
        model: None,
    });

    (
        ReadinessPublisher {
            flags: flags.clone(),
            sender,
        },
        ReadinessView { flags, receiver },
    )
}

/// Sole writer of the readiness state. Deliberately not `Clone`.
pub struct ReadinessPublisher {
    flags: Arc<Flags>,
    sender: watch::Sender<Status>,
}

impl ReadinessPublisher {
    /// Returns a new reader attached to this state.
    pub fn view(&self) -> ReadinessView {
        ReadinessView {
            flags: self.flags.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Applies a transition. Returns `false` if the state is already terminal.
    pub fn transition(&mut self, state: ReadinessState) -> bool {
        let current = self.sender.borrow().state.clone();
        if current.is_terminal() {
            log::warn!(
                "ignoring readiness transition {} -> {}",
                current.tag(),
                state.tag()
            );
            return false;
        }

        match &state {
            ReadinessState::Ready(name) => {
                // The model must be visible before the flag flips.
                self.confirm_model(name);
                self.flags.ready.store(true, Ordering::Release);
            }
            ReadinessState::Disabled | ReadinessState::Failed => {
                self.flags
                    .permanently_unavailable
                    .store(true, Ordering::Release);
            }
            _ => {}
        }

        self.sender.send_modify(|status| {
            if let ReadinessState::ModelFound(name) | ReadinessState::Ready(name) = &state {
                status.model = Some(name.clone());
            }
            status.state = state;
        });
        true
    }

    /// Stores the confirmed model. Only the first confirmation sticks.
    fn confirm_model(&self, name: &str) -> bool {
        let stored = self
            .flags
            .model
            .set(ModelDescriptor {
                name: name.to_owned(),
            })
            .is_ok();
        if !stored {
            log::warn!("model already confirmed, ignoring {name}");
        }
        stored
    }
}

impl ReadinessSink for ReadinessPublisher {
    fn publish(&mut self, state: ReadinessState) {
        self.transition(state);
    }
}

/// Cheap, cloneable reader handed to every connection task.
#[derive(Clone)]
pub struct ReadinessView {
    flags: Arc<Flags>,
    receiver: watch::Receiver<Status>,
}

impl ReadinessView {
    pub fn is_ready(&self) -> bool {
        self.flags.ready.load(Ordering::Acquire)
    }

    pub fn is_permanently_unavailable(&self) -> bool {
        self.flags.permanently_unavailable.load(Ordering::Acquire)
    }

    /// The confirmed model, available once the state reached `Ready`.
    pub fn model(&self) -> Option<&ModelDescriptor> {
        if self.is_ready() {
            self.flags.model.get()
        } else {
            None
        }
    }

    pub fn status(&self) -> Status {
        self.receiver.borrow().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let status = self.status();
        let attempt = match status.state {
            ReadinessState::RetryAttempt(n) => Some(n),
            _ => None,
        };

        // Everything comes from the same watch value, never from the flags.
        StatusSnapshot {
            ready: matches!(status.state, ReadinessState::Ready(_)),
            status: status.state.tag(),
            attempt,
            model: status.model.unwrap_or_default(),
        }
    }

    /// Waits until the warm-up settles in a terminal state.
    pub async fn settled(&mut self) -> ReadinessState {
        let settled = self
            .receiver
            .wait_for(|status| status.state.is_terminal())
            .await
            .map(|status| status.state.clone());

        // The publisher is gone; whatever it left behind is final.
        settled.unwrap_or_else(|_| self.receiver.borrow().state.clone())
    }
}
