//! Configuration for sightline-eye

use crate::codec::ResizeFilter;
use crate::error::VisionError;
use crate::models::{coco_class_names, ModelSource, OutputLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Detection pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Model asset handed to the engine at init time
    pub model: ModelSource,
    /// Expected hex SHA-256 of the model bytes
    pub model_checksum: Option<String>,
    /// Where downloaded models are cached
    pub cache_dir: Option<PathBuf>,
    /// Side of the square model input
    pub input_size: u32,
    /// Attach class names to detections
    pub emit_labels: bool,
    /// Rows below this confidence are discarded (inclusive threshold)
    pub confidence_threshold: f32,
    /// NMS overlap above which the lower-scored box is suppressed
    pub iou_threshold: f32,
    /// Label table, index = class id
    pub class_names: Vec<String>,
    /// Number of classes the model predicts; defaults to `class_names.len()`
    pub num_classes: Option<usize>,
    /// Output row layout of the exported model
    pub layout: OutputLayout,
    /// Override for the output row width
    pub row_stride: Option<usize>,
    /// Only suppress overlapping boxes of the same class
    pub class_aware_nms: bool,
    /// Resampling used when packing frames
    pub resize_filter: ResizeFilter,
    /// Capacity of the producer → worker request channel
    pub request_buffer: usize,
    /// Capacity of the worker → producer response channel
    pub response_buffer: usize,
    /// Device ordinal for the accelerated backend
    pub accelerator_device_id: i32,
    /// Intra-op threads for the engine, 0 = engine default
    pub intra_threads: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().map(|mut p| {
            p.push("sightline");
            p.push("models");
            p
        });

        Self {
            model: ModelSource::default(),
            model_checksum: None,
            cache_dir,
            input_size: 640,
            emit_labels: true,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            class_names: coco_class_names(),
            num_classes: None,
            layout: OutputLayout::ClassId,
            row_stride: None,
            class_aware_nms: false,
            resize_filter: ResizeFilter::Bilinear,
            request_buffer: 16,
            response_buffer: 16,
            accelerator_device_id: 0,
            intra_threads: 0,
        }
    }
}

impl VisionConfig {
    pub const MAX_INPUT_SIZE: u32 = 4096;

    /// Number of classes used for range-checking decoded class ids
    pub fn num_classes(&self) -> usize {
        self.num_classes.unwrap_or(self.class_names.len())
    }

    /// Row width expected in the model output
    pub fn row_stride(&self) -> usize {
        self.row_stride
            .unwrap_or_else(|| self.layout.stride(self.num_classes()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VisionError> {
        if self.input_size == 0 || self.input_size > Self::MAX_INPUT_SIZE {
            return Err(VisionError::Config(format!(
                "Input size must be between 1 and {}",
                Self::MAX_INPUT_SIZE
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(VisionError::Config(
                "Confidence threshold must be within [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(VisionError::Config(
                "IoU threshold must be within [0, 1]".to_string(),
            ));
        }

        if self.num_classes() == 0 {
            return Err(VisionError::Config(
                "Either class_names or num_classes must be set".to_string(),
            ));
        }

        let min_stride = self.layout.min_stride();
        if self.row_stride() < min_stride {
            return Err(VisionError::Config(format!(
                "Row stride {} is too small for {:?} (min {})",
                self.row_stride(),
                self.layout,
                min_stride
            )));
        }

        if self.request_buffer == 0 || self.request_buffer > 1024 {
            return Err(VisionError::Config(
                "Request buffer must be between 1 and 1024".to_string(),
            ));
        }

        if self.response_buffer == 0 || self.response_buffer > 1024 {
            return Err(VisionError::Config(
                "Response buffer must be between 1 and 1024".to_string(),
            ));
        }

        if self.accelerator_device_id < 0 {
            return Err(VisionError::Config(
                "Accelerator device id must be non-negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Load and validate a TOML or YAML file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str::<VisionConfig>(&content)
                .map_err(|e| VisionError::Config(format!("Invalid TOML in {:?}: {}", path, e)))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str::<VisionConfig>(&content)
                .map_err(|e| VisionError::Config(format!("Invalid YAML in {:?}: {}", path, e)))?,
            _ => Self::parse(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML, falling back to YAML
    pub fn parse(content: &str) -> Result<Self, VisionError> {
        if let Ok(config) = toml::from_str::<VisionConfig>(content) {
            return Ok(config);
        }
        serde_yaml::from_str::<VisionConfig>(content)
            .map_err(|e| VisionError::Config(format!("Unrecognized configuration format: {}", e)))
    }
}
