//! sightline-eye: real-time object detection scheduling and postprocessing
//!
//! Frames from a live source are handed to an isolated inference worker that
//! keeps at most one frame in flight, drops frames that arrive while it is
//! busy or out of order, and answers each admitted frame with NMS-filtered
//! detections.
//!
//! The inference engine is pluggable through [`Engine`]; the `onnx` feature
//! provides one backed by ONNX Runtime.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod models;
pub mod processing;
pub mod scheduler;
pub mod session;
pub mod tensor;
pub mod worker;

pub use backend::{Backend, Engine, Executor};
pub use config::VisionConfig;
pub use error::{BackendUnavailable, DecodeError, EncodeError, EngineError, InferenceError, VisionError};
pub use frame::{Frame, FrameClock, FrameDimensions, PixelFormat};
pub use models::{Detection, ModelFetcher, ModelSource, OutputLayout};
pub use processing::{DetectionPipeline, FrameResult};
pub use scheduler::{Admission, DropReason, FrameScheduler, SchedulerState, SchedulerStats};
pub use session::{InferenceSession, SessionState};
pub use tensor::Tensor;
pub use worker::{InferenceWorker, WorkerHandle, WorkerRequest, WorkerResponse};

#[cfg(feature = "onnx")]
pub use backend::{OnnxEngine, OnnxOptions};
