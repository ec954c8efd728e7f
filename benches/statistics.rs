//! Statistics engine benchmarks
//!
//! Measures descriptive statistics, two-sample comparison and assumption
//! checks across sample sizes on both sides of the small-sample and
//! Shapiro-Wilk thresholds.
//!
//! Run with: cargo bench --bench statistics

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use specbench::StatisticsEngine;

const SIZES: [usize; 3] = [10, 100, 10_000];

/// Deterministic, mildly skewed sample
#[allow(clippy::cast_precision_loss)]
fn sample(n: usize, offset: f64) -> Vec<f64> {
    (0..n)
        .map(|i| offset + ((i * 7919) % 1000) as f64 / 10.0 + (i % 13) as f64)
        .collect()
}

fn bench_descriptive_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptive_stats");
    for size in SIZES {
        let data = sample(size, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| StatisticsEngine::calculate_descriptive_stats(black_box(data)));
        });
    }
    group.finish();
}

fn bench_compare_datasets(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare_datasets");
    for size in SIZES {
        let baseline = sample(size, 0.0);
        let comparison = sample(size, 2.5);
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &(baseline, comparison),
            |b, (baseline, comparison)| {
                b.iter(|| {
                    StatisticsEngine::compare_datasets(
                        black_box(baseline),
                        black_box(comparison),
                        0.05,
                    )
                });
            },
        );
    }
    group.finish();
}

fn bench_assumption_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_statistical_assumptions");
    // 40 uses Shapiro-Wilk, 400 uses Anderson-Darling
    for size in [40, 400] {
        let data = sample(size, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| StatisticsEngine::validate_statistical_assumptions(black_box(data)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_descriptive_stats,
    bench_compare_datasets,
    bench_assumption_checks
);
criterion_main!(benches);
