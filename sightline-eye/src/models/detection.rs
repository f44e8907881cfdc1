//! Detected object boxes

use crate::frame::FrameDimensions;
use serde::{Deserialize, Serialize};

/// Detected object, in model-input pixel space (`[0, input_size)`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub score: f32,
    pub class_id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Detection {
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Map a box from the square model input back onto the original frame.
    pub fn rescale(&self, input_size: u32, frame: FrameDimensions) -> Detection {
        let sx = frame.width as f32 / input_size as f32;
        let sy = frame.height as f32 / input_size as f32;
        Detection {
            x: self.x * sx,
            y: self.y * sy,
            w: self.w * sx,
            h: self.h * sy,
            ..self.clone()
        }
    }
}
