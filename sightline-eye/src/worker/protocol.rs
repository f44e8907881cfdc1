//! Messages exchanged between a frame producer and the inference worker

use crate::backend::Backend;
use crate::frame::{Frame, FrameDimensions};
use crate::models::Detection;
use crate::processing::FrameResult;
use serde::{Deserialize, Serialize};

/// Producer → worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Bring up a session for this input size
    Init { input_size: u32 },
    /// Run detection on one frame
    Infer {
        frame: Frame,
        input_size: u32,
        emit_labels: bool,
    },
    /// Finish the in-flight frame, then exit
    Stop,
}

/// Worker → producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    Ready {
        backend: Backend,
    },
    Result {
        frame_id: u64,
        detections: Vec<Detection>,
        dimensions: FrameDimensions,
    },
    Error {
        message: String,
    },
    /// The worker has drained and exited; nothing follows
    Stopped,
}

impl WorkerResponse {
    pub fn error(err: impl std::fmt::Display) -> Self {
        WorkerResponse::Error {
            message: err.to_string(),
        }
    }
}

impl From<FrameResult> for WorkerResponse {
    fn from(result: FrameResult) -> Self {
        WorkerResponse::Result {
            frame_id: result.frame_id,
            detections: result.detections,
            dimensions: result.dimensions,
        }
    }
}
