//! Error types for sightline-eye

use crate::session::SessionState;
use thiserror::Error;

/// A frame could not be packed into a model input tensor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Empty frame: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Input size must be non-zero")]
    InvalidInputSize,

    #[error("Row stride {stride} is smaller than {min} bytes")]
    InvalidStride { stride: usize, min: usize },

    #[error("Pixel buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

/// The raw model output does not match the configured layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected output shape {0:?}, expected [1, N, K]")]
    UnexpectedShape(Vec<usize>),

    #[error("Output row stride mismatch: expected {expected}, got {actual}")]
    StrideMismatch { expected: usize, actual: usize },

    #[error("Output truncated: expected {expected} values, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// No execution strategy could be brought up for the model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendUnavailable {
    #[error("Model asset unavailable: {0}")]
    ModelAsset(String),

    #[error("No inference backend available (accelerated: {accelerated}; fallback: {fallback})")]
    Exhausted { accelerated: String, fallback: String },
}

/// Errors from running an already constructed session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Inference session is not ready")]
    NotReady,

    #[error("Inference execution failed: {0}")]
    ExecutionFailed(String),
}

/// Error text reported by the underlying inference engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    BackendUnavailable(#[from] BackendUnavailable),

    #[error("{0}")]
    Inference(#[from] InferenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session is {0:?}; a new session is required")]
    InvalidState(SessionState),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("Worker error: {0}")]
    Worker(String),
}
