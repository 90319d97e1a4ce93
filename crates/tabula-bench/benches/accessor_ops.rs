//! Criterion micro-benchmarks for block acquisition: zero-copy views,
//! converting copies and CSR densification.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tabula_bench::Profile;
use tabula_dispatch::CacheInfo;
use tabula_table::{ReadRows, WriteOnlyRows};
use tabula_test_utils::TableLayout;

fn block_rows(profile: Profile) -> usize {
    CacheInfo::detect().block_size_for_rows(profile.n_cols, size_of::<f64>())
}

/// Walk the whole table in cache-sized row blocks.
fn sweep<T: tabula_core::NumericValue>(table: &dyn tabula_table::NumericTable, block: usize) -> usize {
    let mut seen = 0;
    let mut start = 0;
    while start < table.n_rows() {
        let mut rows = ReadRows::<T>::new(table, start, block).unwrap();
        seen += rows.get().len();
        start += rows.n_rows();
        rows.release().unwrap();
    }
    seen
}

fn bench_read_rows(c: &mut Criterion) {
    let profile = Profile::REFERENCE;
    let block = block_rows(profile);
    let dense = profile.table::<f64>(TableLayout::RowMajor, 1);
    let soa = profile.table::<f64>(TableLayout::Soa, 1);
    let csr = profile.table::<f64>(TableLayout::Csr, 1);

    c.bench_function("read_rows_dense_zero_copy", |b| {
        b.iter(|| black_box(sweep::<f64>(dense.as_ref(), block)))
    });
    c.bench_function("read_rows_dense_as_f32", |b| {
        b.iter(|| black_box(sweep::<f32>(dense.as_ref(), block)))
    });
    c.bench_function("read_rows_soa_gather", |b| {
        b.iter(|| black_box(sweep::<f64>(soa.as_ref(), block)))
    });
    c.bench_function("read_rows_csr_densify", |b| {
        b.iter(|| black_box(sweep::<f64>(csr.as_ref(), block)))
    });
}

fn bench_write_only_rows(c: &mut Criterion) {
    let profile = Profile::REFERENCE;
    let table = profile.table::<f32>(TableLayout::RowMajor, 2);
    c.bench_function("write_only_rows_f64_into_f32", |b| {
        b.iter(|| {
            let mut rows = WriteOnlyRows::<f64>::new(table.as_ref(), 0, 1024).unwrap();
            rows.get_mut().fill(0.5);
            rows.release().unwrap();
        })
    });
}

criterion_group!(benches, bench_read_rows, bench_write_only_rows);
criterion_main!(benches);
