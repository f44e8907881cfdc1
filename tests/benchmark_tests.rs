use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sightline_eye::codec::{decode, encode, DecodeOptions, ResizeFilter};
use sightline_eye::processing::suppress;
use sightline_eye::{Detection, Frame, Tensor, VisionConfig};

fn bench_encode(c: &mut Criterion) {
    let frame = Frame::filled(1, 1280, 720, [90, 120, 150, 255]);
    let square = Frame::filled(1, 640, 640, [90, 120, 150, 255]);

    c.bench_function("encode_720p_bilinear_640", |b| {
        b.iter(|| encode(black_box(&frame), 640, ResizeFilter::Bilinear).unwrap())
    });
    c.bench_function("encode_720p_nearest_640", |b| {
        b.iter(|| encode(black_box(&frame), 640, ResizeFilter::Nearest).unwrap())
    });
    c.bench_function("encode_640_no_resize", |b| {
        b.iter(|| encode(black_box(&square), 640, ResizeFilter::Bilinear).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let config = VisionConfig::default();
    let options = DecodeOptions::from_config(&config);
    let rows = 8400;
    let data: Vec<f32> = (0..rows)
        .flat_map(|i| {
            let conf = if i % 50 == 0 { 0.9 } else { 0.01 };
            [(i % 640) as f32, (i / 14) as f32, 32.0, 32.0, conf, (i % 80) as f32]
        })
        .collect();
    let raw = Tensor::new(vec![1, rows, 6], data).unwrap();

    c.bench_function("decode_8400_rows", |b| {
        b.iter(|| decode(black_box(&raw), &options).unwrap())
    });
}

fn bench_suppress(c: &mut Criterion) {
    let detections: Vec<Detection> = (0..300)
        .map(|i| Detection {
            x: (i % 20) as f32 * 30.0,
            y: (i / 20) as f32 * 30.0,
            w: 40.0,
            h: 40.0,
            score: 1.0 - i as f32 / 300.0,
            class_id: i % 80,
            label: None,
        })
        .collect();

    c.bench_function("suppress_300", |b| {
        b.iter(|| suppress(black_box(detections.clone()), 0.45))
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_suppress);
criterion_main!(benches);
