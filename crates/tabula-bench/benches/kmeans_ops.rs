//! Criterion benchmarks for k-means passes and norms.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tabula_bench::{clustered, Profile};
use tabula_kernels::kmeans::{InitMethod, KMeans, KMeansParams};
use tabula_kernels::norms;
use tabula_test_utils::TableLayout;

const K: usize = 8;

fn bench_lloyd_step(c: &mut Criterion) {
    let data = clustered(1, K, 10_000, 8);
    let model = KMeans::new(KMeansParams::new(K)).unwrap();
    let centroids = model.init(data.as_ref()).unwrap();
    c.bench_function("kmeans_lloyd_step_80k", |b| {
        b.iter(|| black_box(model.lloyd_step(data.as_ref(), &centroids, false).unwrap()))
    });
}

fn bench_postprocess(c: &mut Criterion) {
    let data = clustered(2, K, 10_000, 8);
    let model = KMeans::new(KMeansParams::new(K)).unwrap();
    let centroids = model.init(data.as_ref()).unwrap();
    c.bench_function("kmeans_postprocess_80k", |b| {
        b.iter(|| black_box(model.postprocess(data.as_ref(), &centroids).unwrap()))
    });
}

fn bench_plus_plus_init(c: &mut Criterion) {
    let data = clustered(3, K, 5_000, 8);
    let model = KMeans::new(KMeansParams {
        init: InitMethod::PlusPlus,
        ..KMeansParams::new(K)
    })
    .unwrap();
    c.bench_function("kmeans_plus_plus_init_40k", |b| {
        b.iter(|| black_box(model.init(data.as_ref()).unwrap()))
    });
}

fn bench_row_norms(c: &mut Criterion) {
    let table = Profile::REFERENCE.table::<f64>(TableLayout::RowMajor, 4);
    c.bench_function("norms_row_l2_100k", |b| {
        b.iter(|| black_box(norms::row_l2_norms(table.as_ref()).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_lloyd_step,
    bench_postprocess,
    bench_plus_plus_init,
    bench_row_norms
);
criterion_main!(benches);
