//! Criterion benchmarks for the autoencoder fan-out: sequential vs parallel.
//!
//! Run with: `cargo bench --bench dae_bench`
//!
//! ## Benchmarks
//!
//! 1. **Forward pass** — full middle + output evaluation across thread counts
//! 2. **Middle extraction** — batch compressed-representation throughput
//! 3. **Single training trial** — one forward-check-update round

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use dae::{Config, DenoisingAutoencoder};
use ndarray::Array1;

/// Deterministic pseudo-pattern so benches need no RNG plumbing.
fn pattern(dim: usize, phase: usize) -> Array1<f64> {
    Array1::from(
        (0..dim)
            .map(|i| if (i + phase) % 3 == 0 { 1.0 } else { 0.0 })
            .collect::<Vec<f64>>(),
    )
}

fn bench_config(threads: usize) -> Config {
    Config {
        num_threads: threads,
        seed: Some(1),
        ..Config::default()
    }
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_256_128");
    for threads in [1usize, 2, 4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                let mut dae =
                    DenoisingAutoencoder::with_config(256, 0.5, bench_config(threads))
                        .expect("valid bench config");
                let input = pattern(256, 0);
                b.iter(|| {
                    black_box(dae.out(black_box(&input), false).expect("valid shape"));
                });
            },
        );
    }
    group.finish();
}

fn bench_middle_output(c: &mut Criterion) {
    c.bench_function("middle_output_batch32_256", |b| {
        let mut dae = DenoisingAutoencoder::with_config(256, 0.5, bench_config(4))
            .expect("valid bench config");
        let batch: Vec<Array1<f64>> = (0..32).map(|i| pattern(256, i)).collect();
        b.iter(|| {
            black_box(dae.middle_output(black_box(&batch)).expect("valid shapes"));
        });
    });
}

fn bench_single_trial(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_trial_64_batch8");
    for threads in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                // tolerance 0 forces the update pass; one trial per learn call
                let config = Config {
                    max_trials: 1,
                    tolerance: 0.0,
                    ..bench_config(threads)
                };
                let clean: Vec<Array1<f64>> = (0..8).map(|i| pattern(64, i)).collect();

                // construction stays in the setup closure so only the
                // forward-check-update round is timed
                b.iter_batched(
                    || {
                        DenoisingAutoencoder::with_config(64, 0.5, config.clone())
                            .expect("valid bench config")
                    },
                    |mut dae| {
                        black_box(dae.learn(&clean, &clean).expect("valid shapes"));
                        dae
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_forward, bench_middle_output, bench_single_trial);
criterion_main!(benches);
