//! Model assets, output layouts and detection records

pub mod detection;
pub mod manager;
pub mod yolo;

pub use detection::Detection;
pub use manager::{ModelFetcher, ModelSource};
pub use yolo::{coco_class_names, OutputLayout, COCO_CLASSES};
