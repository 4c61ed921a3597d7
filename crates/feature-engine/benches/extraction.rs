//! Feature extraction benchmarks
//!
//! Run with: cargo bench --package feature-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use feature_engine::{ExtractorConfig, FeatureExtractor, FeatureSchema};
use std::f64::consts::PI;
use std::time::Duration;

/// Slightly unbalanced 50 Hz supply with a bearing tone and deterministic noise
fn three_phase(n: usize) -> [Vec<f64>; 3] {
    let fs = 25600.0;
    let phase = |k: usize, gain: f64| -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                let shift = 2.0 * PI * k as f64 / 3.0;
                gain * 3.0 * (2.0 * PI * 50.0 * t - shift).sin()
                    + 0.02 * (2.0 * PI * 105.4 * t).sin()
                    + 0.05 * ((i * 31 + k * 17) as f64 * 0.37).sin()
            })
            .collect()
    };
    [phase(0, 1.0), phase(1, 0.98), phase(2, 1.01)]
}

fn bench_window_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Window Extraction");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let schema = FeatureSchema::primary();

    for &size in &[4096usize, 16384] {
        let [a, b, c_] = three_phase(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("extract_and_assemble", size), &size, |bench, _| {
            bench.iter(|| {
                let groups = extractor
                    .extract_channels(black_box(&a), black_box(&b), black_box(&c_))
                    .unwrap();
                black_box(schema.assemble(&groups).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_window_extraction);
criterion_main!(benches);
