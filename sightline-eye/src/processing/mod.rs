//! Vision processing pipelines

pub mod detection;
pub mod nms;

pub use detection::{DetectionPipeline, FrameResult};
pub use nms::{iou, suppress, suppress_with_mode, SuppressionMode, DEFAULT_IOU_THRESHOLD};
