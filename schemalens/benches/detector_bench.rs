use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use schemalens::detector::{
    find_candidate, four_point_transform, preprocess, DebugSink, DetectorConfig, Quad,
    RectificationPolicy, SheetDetector, MIN_CONTOUR_AREA,
};
use schemalens::{CircuitLocation, ModelGateway};
use schemalens::ai::GenerationDefaults;
use std::sync::Arc;

/// 1280x960 page with a hand-drawn-like loop and a few symbols.
fn sketch() -> RgbImage {
    let mut canvas = RgbImage::from_pixel(1280, 960, Rgb([245, 245, 240]));
    let ink = Rgb([30, 30, 30]);
    for t in 0..4 {
        let rect = Rect::at(340 + t, 260 + t).of_size(600 - 2 * t as u32, 440 - 2 * t as u32);
        draw_hollow_rect_mut(&mut canvas, rect, ink);
    }
    draw_filled_rect_mut(&mut canvas, Rect::at(600, 250).of_size(6, 30), ink);
    draw_filled_rect_mut(&mut canvas, Rect::at(620, 240).of_size(6, 50), ink);
    canvas
}

fn bench_preprocess(c: &mut Criterion) {
    let gray: GrayImage = DynamicImage::ImageRgb8(sketch()).to_luma8();
    c.bench_function("preprocess_drawing", |b| {
        b.iter(|| preprocess(black_box(&gray), RectificationPolicy::Drawing));
    });
}

fn bench_find_candidate(c: &mut Criterion) {
    let gray = DynamicImage::ImageRgb8(sketch()).to_luma8();
    let edges = preprocess(&gray, RectificationPolicy::Drawing);
    c.bench_function("find_candidate", |b| {
        b.iter(|| find_candidate(black_box(&edges), RectificationPolicy::Drawing, MIN_CONTOUR_AREA));
    });
}

fn bench_four_point_transform(c: &mut Criterion) {
    let page = sketch();
    let quad = Quad::from_corners([(352.0, 270.0), (930.0, 262.0), (940.0, 700.0), (340.0, 690.0)]);
    c.bench_function("four_point_transform", |b| {
        b.iter(|| four_point_transform(black_box(&page), black_box(&quad)));
    });
}

fn bench_rectify(c: &mut Criterion) {
    let detector = SheetDetector::new(
        Arc::new(ModelGateway::new(GenerationDefaults::default())),
        DetectorConfig::default(),
    );
    let source = DynamicImage::ImageRgb8(sketch());
    let location = CircuitLocation {
        relative_x: 0.5,
        relative_y: 0.5,
        confidence: 0.4,
    };
    let debug = DebugSink::disabled();

    c.bench_function("rectify_drawing", |b| {
        b.iter(|| detector.rectify(black_box(&source), &location, &debug));
    });
}

fn bench_blank_page(c: &mut Criterion) {
    let blank = GrayImage::from_pixel(640, 480, Luma([255]));
    c.bench_function("preprocess_blank", |b| {
        b.iter(|| preprocess(black_box(&blank), RectificationPolicy::Sheet));
    });
}

criterion_group!(
    benches,
    bench_preprocess,
    bench_find_candidate,
    bench_four_point_transform,
    bench_rectify,
    bench_blank_page
);
criterion_main!(benches);
