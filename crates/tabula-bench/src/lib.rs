//! Benchmark profiles for the Tabula numeric-table framework.
//!
//! - [`Profile::REFERENCE`]: 100K rows x 16 columns
//! - [`Profile::STRESS`]: 1M rows x 16 columns
//! - [`clustered`]: blob data for k-means runs

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tabula_core::NumericValue;
use tabula_table::NumericTable;
use tabula_test_utils::{blobs, build_table, random_matrix, TableLayout};

/// Table shape used by a benchmark group.
#[derive(Clone, Copy, Debug)]
pub struct Profile {
    /// Rows.
    pub n_rows: usize,
    /// Columns.
    pub n_cols: usize,
}

impl Profile {
    /// The default benchmark shape.
    pub const REFERENCE: Profile = Profile {
        n_rows: 100_000,
        n_cols: 16,
    };

    /// Ten times the reference row count.
    pub const STRESS: Profile = Profile {
        n_rows: 1_000_000,
        n_cols: 16,
    };

    /// Number of values.
    pub fn len(&self) -> usize {
        self.n_rows * self.n_cols
    }

    /// Whether the profile holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uniform `[-1, 1)` data in `layout`, stored as `S`.
    pub fn table<S: NumericValue>(&self, layout: TableLayout, seed: u64) -> Box<dyn NumericTable> {
        let data = random_matrix(seed, self.n_rows, self.n_cols);
        build_table::<S>(layout, &data, self.n_rows, self.n_cols)
    }
}

/// `k` well-separated clusters of `per_cluster` rows in `n_cols`
/// dimensions, stored row-major as `f64`.
pub fn clustered(seed: u64, k: usize, per_cluster: usize, n_cols: usize) -> Box<dyn NumericTable> {
    let centers: Vec<Vec<f64>> = (0..k)
        .map(|c| (0..n_cols).map(|j| ((c * 7 + j * 3) % 11) as f64 * 10.0).collect())
        .collect();
    let (data, _) = blobs(seed, &centers, per_cluster, 1.0);
    build_table::<f64>(TableLayout::RowMajor, &data, k * per_cluster, n_cols)
}
