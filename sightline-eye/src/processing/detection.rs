//! Object detection pipeline

use crate::codec::{decode, encode, DecodeOptions};
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::frame::{Frame, FrameDimensions};
use crate::models::Detection;
use crate::processing::nms::{suppress_with_mode, SuppressionMode};
use crate::session::InferenceSession;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Detections for one frame, plus the frame size needed to rescale them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub frame_id: u64,
    pub detections: Vec<Detection>,
    pub dimensions: FrameDimensions,
}

/// encode → run → decode → suppress
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    config: Arc<VisionConfig>,
}

impl DetectionPipeline {
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Run one admitted frame through the model
    pub fn process(
        &self,
        session: &mut InferenceSession,
        frame: &Frame,
        input_size: u32,
        emit_labels: bool,
    ) -> Result<FrameResult, VisionError> {
        debug!("Running object detection on frame {}", frame.frame_id());

        let input = encode(frame, input_size, self.config.resize_filter)?;
        let raw = session.run(&input)?;
        let detections = self.postprocess(&raw, emit_labels)?;

        debug!("Frame {}: detected {} objects", frame.frame_id(), detections.len());
        Ok(FrameResult {
            frame_id: frame.frame_id(),
            detections,
            dimensions: frame.dimensions(),
        })
    }

    /// Decode raw model output and suppress overlapping boxes
    pub fn postprocess(&self, raw: &Tensor<f32>, emit_labels: bool) -> Result<Vec<Detection>, VisionError> {
        let options = DecodeOptions::from_config(&self.config).with_labels(emit_labels);
        let candidates = decode(raw, &options)?;
        let candidate_count = candidates.len();

        let kept = suppress_with_mode(
            candidates,
            self.config.iou_threshold,
            SuppressionMode::from_class_aware(self.config.class_aware_nms),
        );
        debug!("NMS kept {} of {} candidates", kept.len(), candidate_count);
        Ok(kept)
    }
}
