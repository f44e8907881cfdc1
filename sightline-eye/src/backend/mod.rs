//! Execution backends and the engine seam
//!
//! The inference engine itself is a black box: an [`Engine`] turns model bytes
//! into an [`Executor`] for a given [`Backend`], and the executor maps one
//! input tensor to one output tensor.

#[cfg(feature = "onnx")]
pub mod onnx;

use crate::error::EngineError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxEngine, OnnxOptions};

/// Execution strategy for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// GPU or other hardware-accelerated execution
    Accelerated,
    /// Portable CPU execution
    Fallback,
}

impl Backend {
    /// Order in which backends are attempted
    pub const ORDER: [Backend; 2] = [Backend::Accelerated, Backend::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Accelerated => "accelerated",
            Backend::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds executors from model bytes
pub trait Engine: Send + Sync {
    fn initialize(&self, backend: Backend, model: &[u8]) -> Result<Box<dyn Executor>, EngineError>;
}

/// A loaded model bound to one backend
pub trait Executor: Send {
    fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_order() {
        assert_eq!(Backend::ORDER, [Backend::Accelerated, Backend::Fallback]);
    }

    #[test]
    fn test_backend_serde() {
        assert_eq!(serde_json::to_string(&Backend::Accelerated).unwrap(), "\"accelerated\"");
        let b: Backend = serde_json::from_str("\"fallback\"").unwrap();
        assert_eq!(b, Backend::Fallback);
        assert_eq!(b.to_string(), "fallback");
    }
}
