//! Test utilities for Tabula development.
//!
//! Provides deterministic random data (seeded ChaCha8), a [`TableLayout`]
//! switch that builds the same logical matrix as a dense, SOA or CSR
//! table, and mock tables in [`fixtures`] for exercising error paths.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tabula_core::{AnyVec, DataType, NumericValue};
use tabula_table::{CsrNumericTable, HomogenNumericTable, NumericTable, SoaNumericTable};

/// Storage layout to build a fixture table in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableLayout {
    RowMajor,
    Soa,
    Csr,
}

impl TableLayout {
    pub const ALL: [TableLayout; 3] = [Self::RowMajor, Self::Soa, Self::Csr];

    /// Layouts that support block writes.
    pub const WRITABLE: [TableLayout; 2] = [Self::RowMajor, Self::Soa];
}

/// Seeded generator used by every fixture.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `n_rows x n_cols` values uniform in `[-1, 1)`, row-major.
pub fn random_matrix(seed: u64, n_rows: usize, n_cols: usize) -> Vec<f64> {
    let mut rng = rng(seed);
    (0..n_rows * n_cols)
        .map(|_| rng.random_range(-1.0..1.0))
        .collect()
}

/// Well-separated clusters: `centers` rows of `n_cols` coordinates, each
/// with `per_center` points jittered by at most `spread`.
///
/// Returns the row-major data and the generating center of every row.
pub fn blobs(
    seed: u64,
    centers: &[Vec<f64>],
    per_center: usize,
    spread: f64,
) -> (Vec<f64>, Vec<usize>) {
    let mut rng = rng(seed);
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for (c, center) in centers.iter().enumerate() {
        for _ in 0..per_center {
            data.extend(center.iter().map(|x| x + rng.random_range(-spread..=spread)));
            labels.push(c);
        }
    }
    (data, labels)
}

/// Zero out roughly `1 - density` of the entries, for sparse fixtures.
pub fn sparsify(seed: u64, data: &mut [f64], density: f64) {
    let mut rng = rng(seed);
    for v in data.iter_mut() {
        if rng.random::<f64>() >= density {
            *v = 0.0;
        }
    }
}

/// Convert a row-major `f64` matrix to the storage type `S`.
pub fn cast<S: NumericValue>(data: &[f64]) -> Vec<S> {
    data.iter().map(|&v| S::from_f64(v)).collect()
}

/// Split a row-major matrix into per-column buffers of type `S`.
pub fn columns_of<S: NumericValue>(data: &[f64], n_rows: usize, n_cols: usize) -> Vec<AnyVec> {
    (0..n_cols)
        .map(|j| {
            let col: Vec<S> = (0..n_rows).map(|i| S::from_f64(data[i * n_cols + j])).collect();
            S::into_any_vec(col)
        })
        .collect()
}

/// Build `data` (row-major, `n_rows x n_cols`) in `layout`, storing
/// values as `S`.
///
/// # Panics
///
/// Panics if `data.len() != n_rows * n_cols`.
pub fn build_table<S: NumericValue>(
    layout: TableLayout,
    data: &[f64],
    n_rows: usize,
    n_cols: usize,
) -> Box<dyn NumericTable> {
    match layout {
        TableLayout::RowMajor => Box::new(
            HomogenNumericTable::from_vec(cast::<S>(data), n_rows, n_cols)
                .expect("fixture dims"),
        ),
        TableLayout::Soa => Box::new(
            SoaNumericTable::from_columns(columns_of::<S>(data, n_rows, n_cols))
                .expect("fixture columns"),
        ),
        TableLayout::Csr => Box::new(
            CsrNumericTable::from_dense(&cast::<S>(data), n_rows, n_cols).expect("fixture csr"),
        ),
    }
}

/// [`build_table`] with the storage type chosen at runtime.
pub fn build_table_as(
    data_type: DataType,
    layout: TableLayout,
    data: &[f64],
    n_rows: usize,
    n_cols: usize,
) -> Box<dyn NumericTable> {
    match data_type {
        DataType::F32 => build_table::<f32>(layout, data, n_rows, n_cols),
        DataType::F64 => build_table::<f64>(layout, data, n_rows, n_cols),
        DataType::I32 => build_table::<i32>(layout, data, n_rows, n_cols),
    }
}

/// An SOA table whose columns cycle through `f64`, `f32` and `i32`.
pub fn mixed_soa(data: &[f64], n_rows: usize, n_cols: usize) -> SoaNumericTable {
    let columns = (0..n_cols)
        .map(|j| {
            let col = (0..n_rows).map(|i| data[i * n_cols + j]);
            match j % 3 {
                0 => AnyVec::F64(col.collect()),
                1 => AnyVec::F32(col.map(|v| v as f32).collect()),
                _ => AnyVec::I32(col.map(|v| v as i32).collect()),
            }
        })
        .collect();
    SoaNumericTable::from_columns(columns).expect("fixture columns")
}
