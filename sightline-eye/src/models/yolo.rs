//! YOLO export layouts and the COCO label table

use serde::{Deserialize, Serialize};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Owned copy of [`COCO_CLASSES`], the default label table
pub fn coco_class_names() -> Vec<String> {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
}

/// Per-row layout of the `[1, N, K]` detection output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `[x, y, w, h, confidence, class_id]` (end-to-end exports such as YOLO11)
    #[default]
    ClassId,
    /// `[cx, cy, w, h, objectness, p_0 .. p_C]` (legacy 85-wide exports)
    ClassScores,
}

impl OutputLayout {
    /// Row width of the fixed class id layout
    pub const CLASS_ID_STRIDE: usize = 6;
    /// Box plus objectness, preceding the class probabilities
    pub const SCORES_HEADER: usize = 5;

    /// Values per detection row for `num_classes` classes
    pub fn stride(self, num_classes: usize) -> usize {
        match self {
            OutputLayout::ClassId => Self::CLASS_ID_STRIDE,
            OutputLayout::ClassScores => Self::SCORES_HEADER + num_classes,
        }
    }

    /// Narrowest row that still holds every column this layout reads
    pub fn min_stride(self) -> usize {
        match self {
            OutputLayout::ClassId => Self::CLASS_ID_STRIDE,
            OutputLayout::ClassScores => Self::SCORES_HEADER + 1,
        }
    }
}
