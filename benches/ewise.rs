//! Benchmarks for element-wise operations
//!
//! Sparse/sparse merges at growing size ratios (linear merge against
//! binary search), and the full fast path.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use grblas::{ewise_add, ewise_mult, BinaryOp, Context, Descriptor, Format, Matrix, NO_MASK};
use rand::{Rng, SeedableRng};

fn random_matrix(n: usize, nnz: usize, seed: u64) -> Matrix<f64> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut m = Matrix::new_with_format(n, n, Format::ByCol);
    let rows: Vec<usize> = (0..nnz).map(|_| rng.gen_range(0..n)).collect();
    let cols: Vec<usize> = (0..nnz).map(|_| rng.gen_range(0..n)).collect();
    let vals: Vec<f64> = (0..nnz).map(|_| rng.gen()).collect();
    m.build(&rows, &cols, &vals, Some(&BinaryOp::plus())).expect("build");
    m
}

fn bench_merge_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("ewise_merge_ratio");
    let ctx = Context::default();
    let n = 20_000;
    let big = random_matrix(n, 400_000, 1);
    for small_nnz in [400_000, 40_000, 4_000] {
        let small = random_matrix(n, small_nnz, 2);
        group.bench_with_input(BenchmarkId::new("add", small_nnz), &small_nnz, |bencher, _| {
            bencher.iter(|| {
                let mut out = Matrix::<f64>::new_with_format(n, n, Format::ByCol);
                ewise_add(
                    &ctx,
                    &mut out,
                    NO_MASK,
                    None,
                    &BinaryOp::<f64>::plus(),
                    black_box(&big),
                    black_box(&small),
                    &Descriptor::default(),
                )
                .expect("ewise_add");
                out
            })
        });
        group.bench_with_input(BenchmarkId::new("mult", small_nnz), &small_nnz, |bencher, _| {
            bencher.iter(|| {
                let mut out = Matrix::<f64>::new_with_format(n, n, Format::ByCol);
                ewise_mult(
                    &ctx,
                    &mut out,
                    NO_MASK,
                    None,
                    &BinaryOp::<f64>::times(),
                    black_box(&big),
                    black_box(&small),
                    &Descriptor::default(),
                )
                .expect("ewise_mult");
                out
            })
        });
    }
    group.finish();
}

fn bench_full(c: &mut Criterion) {
    let ctx = Context::default();
    let n = 1000;
    let a = Matrix::import_dense(
        n,
        n,
        (0..n * n).map(|k| k as f64).collect(),
        Format::ByRow,
    )
    .expect("dense");
    let b = Matrix::full_iso(n, n, 2.0, Format::ByRow);
    c.bench_function("ewise_add_full", |bencher| {
        bencher.iter(|| {
            let mut out = Matrix::<f64>::new(n, n);
            ewise_add(
                &ctx,
                &mut out,
                NO_MASK,
                None,
                &BinaryOp::<f64>::plus(),
                black_box(&a),
                black_box(&b),
                &Descriptor::default(),
            )
            .expect("ewise_add");
            out
        })
    });
}

criterion_group!(benches, bench_merge_ratio, bench_full);
criterion_main!(benches);
