//! Inference session: backend selection and model execution

use crate::backend::{Backend, Engine, Executor};
use crate::error::{BackendUnavailable, InferenceError, VisionError};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle of a session. A session loads at most one model, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

/// Owns the executor and the backend it was built for.
///
/// Moving between models or backends means building a new session.
pub struct InferenceSession {
    engine: Arc<dyn Engine>,
    state: SessionState,
    backend: Option<Backend>,
    executor: Option<Box<dyn Executor>>,
}

impl fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceSession")
            .field("state", &self.state)
            .field("backend", &self.backend)
            .finish()
    }
}

impl InferenceSession {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            state: SessionState::Uninitialized,
            backend: None,
            executor: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Backend chosen by [`load`](Self::load), once ready
    pub fn backend(&self) -> Option<Backend> {
        self.backend
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Build an executor for `model`, preferring the accelerated backend.
    ///
    /// The fallback backend is tried exactly once if the accelerated one fails.
    /// If both fail the session is left `Failed` and the error carries both
    /// engine messages.
    pub fn load(&mut self, model: &[u8]) -> Result<Backend, VisionError> {
        if self.state != SessionState::Uninitialized {
            return Err(VisionError::InvalidState(self.state));
        }
        self.state = SessionState::Loading;

        let accelerated = match self.engine.initialize(Backend::Accelerated, model) {
            Ok(executor) => return Ok(self.ready(Backend::Accelerated, executor)),
            Err(e) => e,
        };
        warn!(
            "Accelerated backend unavailable ({}), falling back to {}",
            accelerated,
            Backend::Fallback
        );

        match self.engine.initialize(Backend::Fallback, model) {
            Ok(executor) => Ok(self.ready(Backend::Fallback, executor)),
            Err(fallback) => {
                self.state = SessionState::Failed;
                Err(BackendUnavailable::Exhausted {
                    accelerated: accelerated.0,
                    fallback: fallback.0,
                }
                .into())
            }
        }
    }

    fn ready(&mut self, backend: Backend, executor: Box<dyn Executor>) -> Backend {
        self.executor = Some(executor);
        self.backend = Some(backend);
        self.state = SessionState::Ready;
        info!("Inference session ready on {} backend", backend);
        backend
    }

    /// Execute the model once. Failures are reported verbatim and never retried.
    pub fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, InferenceError> {
        if self.state != SessionState::Ready {
            return Err(InferenceError::NotReady);
        }
        let executor = self.executor.as_mut().ok_or(InferenceError::NotReady)?;
        executor
            .run(input)
            .map_err(|e| InferenceError::ExecutionFailed(e.0))
    }
}
