//! Greedy non-maximum suppression

use crate::models::Detection;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Which detections are compared against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionMode {
    /// Any two overlapping boxes compete, regardless of class
    #[default]
    ClassAgnostic,
    /// Only boxes with the same `class_id` compete
    ClassAware,
}

impl SuppressionMode {
    pub fn from_class_aware(class_aware: bool) -> Self {
        if class_aware {
            SuppressionMode::ClassAware
        } else {
            SuppressionMode::ClassAgnostic
        }
    }
}

/// Intersection over union of two `x, y, w, h` rectangles.
///
/// Returns 0 for disjoint boxes, degenerate boxes and non-finite input.
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let coords = [a.x, a.y, a.w, a.h, b.x, b.y, b.w, b.h];
    if coords.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    if a.w < 0.0 || a.h < 0.0 || b.w < 0.0 || b.h < 0.0 {
        return 0.0;
    }

    let inter_x_min = a.x.max(b.x);
    let inter_y_min = a.y.max(b.y);
    let inter_x_max = (a.x + a.w).min(b.x + b.w);
    let inter_y_max = (a.y + a.h).min(b.y + b.h);

    if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
        return 0.0;
    }

    let intersection = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }

    (intersection / union).clamp(0.0, 1.0)
}

/// Class-agnostic suppression
pub fn suppress(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    suppress_with_mode(detections, iou_threshold, SuppressionMode::ClassAgnostic)
}

/// Keep the highest-scoring boxes, dropping any box that overlaps an
/// already-kept box by more than `iou_threshold`.
///
/// Output is ordered by descending score; equal scores keep their input order.
pub fn suppress_with_mode(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    mode: SuppressionMode,
) -> Vec<Detection> {
    // stable: ties stay in input order; NaN scores sort last
    let rank = |d: &Detection| if d.score.is_nan() { f32::NEG_INFINITY } else { d.score };
    detections.sort_by(|a, b| rank(b).total_cmp(&rank(a)));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = kept.iter().any(|k| {
            let competes = match mode {
                SuppressionMode::ClassAgnostic => true,
                SuppressionMode::ClassAware => k.class_id == candidate.class_id,
            };
            competes && iou(k, &candidate) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
