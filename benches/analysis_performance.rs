use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lapcoach::TelemetrySample;
use lapcoach::analysis::{features, normalizer};
use lapcoach::config::AnalyzerConfig;
use std::f64::consts::PI;
use std::time::Duration;

fn create_lap(samples: usize) -> Vec<TelemetrySample> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / 60.; // ~60Hz
            TelemetrySample {
                timestamp: t,
                speed: 50. + 20. * (2. * PI * 0.05 * t).sin(),
                rpm: 7000. + 1500. * (2. * PI * 0.5 * t).sin(),
                gear: 3 + (i / 300 % 3) as i32,
                steer: 120. * (2. * PI * 0.1 * t).sin() + if i % 7 == 0 { 2. } else { 0. },
                throttle: (0.5 + 0.6 * (2. * PI * 0.1 * t).cos()).clamp(0., 1.),
                brake: (-0.6 * (2. * PI * 0.1 * t).cos()).clamp(0., 1.),
                spline: (i as f64 / samples as f64).fract(),
            }
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");

    for size in [1_000, 10_000] {
        let lap = create_lap(size);
        group.bench_with_input(BenchmarkId::new("full_pipeline", size), &lap, |b, lap| {
            b.iter(|| black_box(lapcoach::analyze(black_box(lap))));
        });
    }

    let mut reversed = create_lap(10_000);
    reversed.reverse();
    group.bench_function("full_pipeline_unsorted_10000", |b| {
        b.iter(|| black_box(lapcoach::analyze(black_box(&reversed))));
    });

    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let config = AnalyzerConfig::default();
    let lap = create_lap(10_000);

    group.bench_function("normalize_10000", |b| {
        b.iter(|| black_box(normalizer::normalize(black_box(&lap), &config.normalizer)));
    });

    if let normalizer::Normalized::Ready(normalized) = normalizer::normalize(&lap, &config.normalizer)
    {
        group.bench_function("extract_features_10000", |b| {
            b.iter(|| black_box(features::extract(black_box(&normalized), &config.features)));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = bench_analyze, bench_stages
}

criterion_main!(benches);
