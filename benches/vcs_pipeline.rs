use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma, imageops};
use vc_ticket::align::{AlignmentStrategy, HomographyStrategy};
use vc_ticket::detector::features::{FeatureConfig, detect_and_describe};
use vc_ticket::detector::markers::detect_markers;
use vc_ticket::utils::imaging::encode_png;
use vc_ticket::{AlignmentEngine, ShareGenerator, combine};

const PAYLOAD: &str = "Ada|ada@example.com|u-1|87654321|1700086400|\
    3b1f0c9a7e5d2c4b8a6f1e0d9c8b7a6f5e4d3c2b1a0f9e8d7c6b5a4f3e2d1c0b";

fn bench_generate(c: &mut Criterion) {
    let generator = ShareGenerator::default();
    c.bench_function("generate_bordered", |b| {
        b.iter(|| generator.generate(black_box(PAYLOAD)))
    });
}

fn bench_combine(c: &mut Criterion) {
    let shares = ShareGenerator::default().with_border(None).generate(PAYLOAD).unwrap();
    c.bench_function("combine", |b| {
        b.iter(|| combine(black_box(&shares.share_a), black_box(&shares.share_b)))
    });
}

fn bench_detect_markers(c: &mut Criterion) {
    let shares = ShareGenerator::default().generate(PAYLOAD).unwrap();
    let rotated = imageops::rotate90(&shares.share_a);
    c.bench_function("detect_markers", |b| {
        b.iter(|| detect_markers(black_box(&rotated)))
    });
}

fn bench_features(c: &mut Criterion) {
    let shares = ShareGenerator::default().with_border(None).generate(PAYLOAD).unwrap();
    let config = FeatureConfig::default();
    c.bench_function("detect_and_describe", |b| {
        b.iter(|| detect_and_describe(black_box(&shares.share_a), &config))
    });
}

fn bench_align(c: &mut Criterion) {
    let shares = ShareGenerator::default().generate(PAYLOAD).unwrap();
    let a = encode_png(&imageops::rotate180(&shares.share_a)).unwrap();
    let b = encode_png(&shares.share_b).unwrap();
    let engine = AlignmentEngine::default();
    c.bench_function("align_fiducial_rotated", |bench| {
        bench.iter(|| engine.align(black_box(&a), black_box(&b)))
    });
}

fn bench_homography(c: &mut Criterion) {
    let shares = ShareGenerator::default().with_border(None).generate(PAYLOAD).unwrap();
    let (w, h) = shares.share_a.dimensions();
    let mut shifted = GrayImage::from_pixel(w, h, Luma([255]));
    imageops::replace(&mut shifted, &shares.share_a, 9, 6);
    let strategy = HomographyStrategy::default();

    let mut group = c.benchmark_group("homography");
    group.sample_size(10);
    group.bench_function("shifted_share", |b| {
        b.iter(|| strategy.attempt(black_box(&shifted), black_box(&shares.share_b)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_generate,
    bench_combine,
    bench_detect_markers,
    bench_features,
    bench_align,
    bench_homography
);
criterion_main!(benches);
