//! SUM kernel benchmarks (reference vs JIT-specialized)
//!
//! Complements the single-sample `measure()` ratio with criterion's
//! repeated sampling over several grid sizes.
//!
//! Run with: cargo bench --bench sum_kernels

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jitbench_db::{Backend, Grid, InterpretedSum, JitCompiler, Reduction, Signature};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SIZES: [usize; 3] = [10, 100, 1_000]; // 100, 10K, 1M elements

/// Benchmark reference vs compiled SUM on square standard-normal grids
fn bench_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum_2d_f64");
    let mut rng = StdRng::seed_from_u64(42);

    let reference = InterpretedSum::new();
    let compiler = JitCompiler::new();
    let accelerated = compiler
        .compile(&reference, Signature::float64_2d_c(), Backend::CostBased)
        .expect("float64[:, ::1] kernel compiles on the SIMD backend");

    for side in SIZES {
        let grid = Grid::random_normal(side, side, &mut rng).expect("square grid");
        let elements = side * side;

        group.bench_with_input(BenchmarkId::new("reference", elements), &grid, |b, grid| {
            b.iter(|| reference.apply(black_box(grid)));
        });

        // Warm-up outside the timed loop
        accelerated.apply(&grid).expect("warm-up");
        group.bench_with_input(BenchmarkId::new("jit", elements), &grid, |b, grid| {
            b.iter(|| accelerated.apply(black_box(grid)));
        });

        // Plain iterator sum as a floor for comparison
        let data = grid.as_f64_slice().expect("random grids are contiguous");
        group.bench_with_input(BenchmarkId::new("iter_sum_baseline", elements), data, |b, data| {
            b.iter(|| black_box(data).iter().sum::<f64>());
        });
    }

    group.finish();
}

/// Benchmark the one-time costs excluded from `measure()`'s timed window
fn bench_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("setup");
    let reference = InterpretedSum::new();

    group.bench_function("compile_cold_cache", |b| {
        b.iter(|| {
            JitCompiler::new()
                .compile(black_box(&reference), Signature::float64_2d_c(), Backend::Simd)
                .expect("compile")
        });
    });

    let mut rng = StdRng::seed_from_u64(7);
    group.bench_function("random_normal_100x100", |b| {
        b.iter(|| Grid::random_normal(100, 100, &mut rng).expect("100x100 grid"));
    });

    group.finish();
}

criterion_group!(benches, bench_sum, bench_setup);
criterion_main!(benches);
