//! Raw model output → detections

use crate::config::VisionConfig;
use crate::error::DecodeError;
use crate::models::{Detection, OutputLayout};
use crate::tensor::Tensor;

/// How to read a `[1, N, K]` output tensor
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions<'a> {
    pub emit_labels: bool,
    pub confidence_threshold: f32,
    pub layout: OutputLayout,
    pub row_stride: Option<usize>,
    pub class_names: &'a [String],
    pub num_classes: usize,
}

impl<'a> DecodeOptions<'a> {
    pub fn from_config(config: &'a VisionConfig) -> Self {
        Self {
            emit_labels: config.emit_labels,
            confidence_threshold: config.confidence_threshold,
            layout: config.layout,
            row_stride: config.row_stride,
            class_names: &config.class_names,
            num_classes: config.num_classes(),
        }
    }

    pub fn with_labels(mut self, emit_labels: bool) -> Self {
        self.emit_labels = emit_labels;
        self
    }

    pub fn expected_stride(&self) -> usize {
        self.row_stride
            .unwrap_or_else(|| self.layout.stride(self.num_classes))
    }

    fn label(&self, class_id: usize) -> Option<String> {
        if self.emit_labels {
            if let Some(name) = self.class_names.get(class_id) {
                return Some(name.clone());
            }
        }
        Some(format!("class_{}", class_id))
    }
}

/// Decode every row of `raw` that passes the confidence and class checks.
///
/// The confidence threshold is inclusive. Rows whose class id falls outside
/// `[0, num_classes)` or whose confidence is not a number are discarded.
/// A row narrower than the layout's minimum is rejected before any row is read.
pub fn decode(raw: &Tensor<f32>, options: &DecodeOptions<'_>) -> Result<Vec<Detection>, DecodeError> {
    let (rows, stride) = match raw.shape() {
        [1, n, k] => (*n, *k),
        [n, k] => (*n, *k),
        other => return Err(DecodeError::UnexpectedShape(other.to_vec())),
    };

    let expected = options.expected_stride();
    if stride != expected {
        return Err(DecodeError::StrideMismatch {
            expected,
            actual: stride,
        });
    }

    let min = options.layout.min_stride();
    if stride < min {
        return Err(DecodeError::StrideMismatch {
            expected: min,
            actual: stride,
        });
    }

    let needed = rows.saturating_mul(stride);
    if raw.data().len() < needed {
        return Err(DecodeError::Truncated {
            expected: needed,
            actual: raw.data().len(),
        });
    }

    let detections = raw
        .data()
        .chunks_exact(stride)
        .take(rows)
        .filter_map(|row| match options.layout {
            OutputLayout::ClassId => decode_class_id_row(row, options),
            OutputLayout::ClassScores => decode_class_scores_row(row, options),
        })
        .collect();

    Ok(detections)
}

fn passes_threshold(confidence: f32, threshold: f32) -> bool {
    // NaN fails this comparison and is dropped
    confidence >= threshold
}

fn decode_class_id_row(row: &[f32], options: &DecodeOptions<'_>) -> Option<Detection> {
    let confidence = row[4];
    if !passes_threshold(confidence, options.confidence_threshold) {
        return None;
    }

    let class = row[5].round();
    if !class.is_finite() || class < 0.0 || class >= options.num_classes as f32 {
        return None;
    }
    let class_id = class as usize;

    Some(Detection {
        x: row[0],
        y: row[1],
        w: row[2],
        h: row[3],
        score: confidence,
        class_id,
        label: options.label(class_id),
    })
}

fn decode_class_scores_row(row: &[f32], options: &DecodeOptions<'_>) -> Option<Detection> {
    let objectness = row[4];
    let probs = &row[OutputLayout::SCORES_HEADER..];

    // Columns past num_classes are padding from a widened row
    let (class_id, best) = probs
        .iter()
        .take(options.num_classes)
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ if p.is_nan() => best,
            _ => Some((idx, p)),
        })?;

    if class_id >= options.num_classes {
        return None;
    }

    let confidence = objectness * best;
    if !passes_threshold(confidence, options.confidence_threshold) {
        return None;
    }

    let (w, h) = (row[2], row[3]);
    Some(Detection {
        x: row[0] - w / 2.0,
        y: row[1] - h / 2.0,
        w,
        h,
        score: confidence,
        class_id,
        label: options.label(class_id),
    })
}
