//! End-to-end tests for the detection pipeline without the worker

mod common;

use common::{init_tracing, test_config, FakeEngine};
use sightline_eye::codec::{encode, ResizeFilter};
use sightline_eye::{
    Backend, Detection, DetectionPipeline, Frame, FrameDimensions, InferenceError, InferenceSession, SessionState,
    VisionError,
};
use std::sync::Arc;

fn ready_session(engine: FakeEngine) -> InferenceSession {
    let mut session = InferenceSession::new(Arc::new(engine));
    session.load(b"fake-model").unwrap();
    session
}

#[test]
fn test_black_frame_encodes_to_zeros() {
    let frame = Frame::filled(1, 640, 640, [0, 0, 0, 255]);
    let tensor = encode(&frame, 640, ResizeFilter::Bilinear).unwrap();

    assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
    assert_eq!(tensor.len(), 3 * 640 * 640);
    assert!(tensor.data().iter().all(|&v| v == 0.0));
}

#[test]
fn test_zero_confidence_output_yields_no_detections() {
    init_tracing();
    let engine = FakeEngine::new().with_rows(vec![[0.0; 6]; 100]);
    let mut session = ready_session(engine);
    let pipeline = DetectionPipeline::new(Arc::new(test_config()));

    let frame = Frame::filled(7, 640, 640, [0, 0, 0, 255]);
    let result = pipeline.process(&mut session, &frame, 640, true).unwrap();

    assert_eq!(result.frame_id, 7);
    assert!(result.detections.is_empty());
    assert_eq!(result.dimensions, FrameDimensions { width: 640, height: 640 });
}

#[test]
fn test_pipeline_suppresses_overlapping_boxes() {
    init_tracing();
    let engine = FakeEngine::new().with_rows(vec![
        [10.0, 10.0, 100.0, 100.0, 0.80, 0.0],
        [12.0, 12.0, 100.0, 100.0, 0.95, 0.0],
        [10.0, 10.0, 100.0, 100.0, 0.60, 16.0],
        [400.0, 400.0, 50.0, 50.0, 0.55, 2.0],
        [400.0, 400.0, 50.0, 50.0, 0.30, 2.0],
    ]);
    let mut session = ready_session(engine);
    let pipeline = DetectionPipeline::new(Arc::new(test_config()));

    let frame = Frame::filled(1, 320, 240, [128, 128, 128, 255]);
    let result = pipeline.process(&mut session, &frame, 640, true).unwrap();

    let summary: Vec<(f32, &str)> = result
        .detections
        .iter()
        .map(|d| (d.score, d.label.as_deref().unwrap_or("")))
        .collect();
    assert_eq!(summary, vec![(0.95, "person"), (0.55, "car")]);
}

#[test]
fn test_class_aware_nms_keeps_other_classes() {
    let engine = FakeEngine::new().with_rows(vec![
        [10.0, 10.0, 100.0, 100.0, 0.95, 0.0],
        [10.0, 10.0, 100.0, 100.0, 0.60, 16.0],
    ]);
    let mut session = ready_session(engine);
    let config = sightline_eye::VisionConfig {
        class_aware_nms: true,
        ..test_config()
    };
    let pipeline = DetectionPipeline::new(Arc::new(config));

    let frame = Frame::filled(1, 64, 64, [0, 0, 0, 255]);
    let result = pipeline.process(&mut session, &frame, 64, true).unwrap();
    let labels: Vec<_> = result.detections.iter().filter_map(|d| d.label.clone()).collect();
    assert_eq!(labels, vec!["person".to_string(), "dog".to_string()]);
}

#[test]
fn test_rescaled_detections_fit_frame() {
    let engine = FakeEngine::new().with_rows(vec![[320.0, 320.0, 64.0, 64.0, 0.9, 0.0]]);
    let mut session = ready_session(engine);
    let pipeline = DetectionPipeline::new(Arc::new(test_config()));

    let frame = Frame::filled(1, 1280, 720, [0, 0, 0, 255]);
    let result = pipeline.process(&mut session, &frame, 640, false).unwrap();
    let scaled: Vec<Detection> = result
        .detections
        .iter()
        .map(|d| d.rescale(640, result.dimensions))
        .collect();

    assert_eq!(scaled[0].x, 640.0);
    assert_eq!(scaled[0].y, 360.0);
    assert_eq!(scaled[0].label.as_deref(), Some("class_0"));
}

#[test]
fn test_session_fallback_then_run() {
    let engine = FakeEngine::new()
        .without_accelerator("no CUDA device")
        .with_rows(vec![[1.0, 1.0, 1.0, 1.0, 0.9, 0.0]]);
    let mut session = InferenceSession::new(Arc::new(engine.clone()));

    assert_eq!(session.load(b"fake-model").unwrap(), Backend::Fallback);
    assert_eq!(engine.init_count(), 2);

    let pipeline = DetectionPipeline::new(Arc::new(test_config()));
    let frame = Frame::filled(1, 8, 8, [0, 0, 0, 255]);
    assert_eq!(pipeline.process(&mut session, &frame, 8, true).unwrap().detections.len(), 1);
}

#[test]
fn test_pipeline_on_unloaded_session() {
    let mut session = InferenceSession::new(Arc::new(FakeEngine::new()));
    let pipeline = DetectionPipeline::new(Arc::new(test_config()));
    let frame = Frame::filled(1, 8, 8, [0, 0, 0, 255]);

    let err = pipeline.process(&mut session, &frame, 8, true).unwrap_err();
    assert!(matches!(err, VisionError::Inference(InferenceError::NotReady)));
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[test]
fn test_pipeline_rejects_empty_frame() {
    let mut session = ready_session(FakeEngine::new());
    let pipeline = DetectionPipeline::new(Arc::new(test_config()));
    let frame = Frame::rgba(1, 0, 0, vec![]);

    assert!(matches!(
        pipeline.process(&mut session, &frame, 640, true),
        Err(VisionError::Encode(_))
    ));
}
