//! Conversions between frames, model tensors and detections

pub mod decode;
pub mod encode;

pub use decode::{decode, DecodeOptions};
pub use encode::{encode, ResizeFilter};
