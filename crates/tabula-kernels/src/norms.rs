//! Row and table norms for iterative solvers.
//!
//! All norms are computed in `f64` over row blocks read through
//! [`ReadRows`], so every layout is accepted. Per-row results land in an
//! `n_rows x 1` table that each block writes through its own
//! [`WriteOnlyRows`] range; whole-table norms reduce per-worker partials
//! after the join.
//!
//! ```
//! use tabula_kernels::norms;
//! use tabula_table::HomogenNumericTable;
//!
//! let t = HomogenNumericTable::from_vec(vec![3.0f64, 4.0, -12.0, 0.0], 2, 2).unwrap();
//! assert_eq!(norms::row_l2_norms(&t).unwrap().to_vec().unwrap(), vec![5.0, 12.0]);
//! assert_eq!(norms::max_abs_norm(&t).unwrap(), 12.0);
//! ```

use std::ops::Range;

use tabula_core::{SafeStatus, Status};
use tabula_table::{
    check_numeric_table, CheckOptions, HomogenNumericTable, NumericTable, ReadRows, WriteOnlyRows,
};
use tabula_threading::{Threader, Tls};

/// Squared L2 norm of every row, as an `n_rows x 1` table.
pub fn row_squared_l2_norms(table: &dyn NumericTable) -> Result<HomogenNumericTable<f64>, Status> {
    row_squared_l2_norms_with(Threader::global(), table)
}

/// [`row_squared_l2_norms`] on an explicit threader.
pub fn row_squared_l2_norms_with(
    threader: &Threader,
    table: &dyn NumericTable,
) -> Result<HomogenNumericTable<f64>, Status> {
    row_norms(threader, table, |s| s)
}

/// L2 norm of every row, as an `n_rows x 1` table.
pub fn row_l2_norms(table: &dyn NumericTable) -> Result<HomogenNumericTable<f64>, Status> {
    row_l2_norms_with(Threader::global(), table)
}

/// [`row_l2_norms`] on an explicit threader.
pub fn row_l2_norms_with(
    threader: &Threader,
    table: &dyn NumericTable,
) -> Result<HomogenNumericTable<f64>, Status> {
    row_norms(threader, table, f64::sqrt)
}

/// Square root of the sum of squares of every value.
pub fn frobenius_norm(table: &dyn NumericTable) -> Result<f64, Status> {
    frobenius_norm_with(Threader::global(), table)
}

/// [`frobenius_norm`] on an explicit threader.
pub fn frobenius_norm_with(threader: &Threader, table: &dyn NumericTable) -> Result<f64, Status> {
    let sum = reduce(threader, table, 0.0, |acc, row| acc + squared(row), |a, b| a + b)?;
    Ok(sum.sqrt())
}

/// Largest absolute value in the table, or NaN if any value is NaN.
/// An empty table has norm 0.
pub fn max_abs_norm(table: &dyn NumericTable) -> Result<f64, Status> {
    max_abs_norm_with(Threader::global(), table)
}

/// [`max_abs_norm`] on an explicit threader.
pub fn max_abs_norm_with(threader: &Threader, table: &dyn NumericTable) -> Result<f64, Status> {
    reduce(
        threader,
        table,
        0.0,
        |acc, row| row.iter().fold(acc, |m, v| max_nan(m, v.abs())),
        max_nan,
    )
}

fn squared(row: &[f64]) -> f64 {
    row.iter().map(|v| v * v).sum()
}

/// `max` that keeps NaN once seen.
fn max_nan(m: f64, v: f64) -> f64 {
    if m.is_nan() || v <= m {
        m
    } else {
        v
    }
}

fn block_rows(threader: &Threader, table: &dyn NumericTable) -> usize {
    threader.block_rows(table.n_rows(), table.n_cols(), size_of::<f64>(), None)
}

fn row_norms(
    threader: &Threader,
    table: &dyn NumericTable,
    finish: fn(f64) -> f64,
) -> Result<HomogenNumericTable<f64>, Status> {
    check_numeric_table(table, &CheckOptions::new("table"))?;
    let n_rows = table.n_rows();
    let out = HomogenNumericTable::<f64>::zeroed(n_rows, 1)?;
    let status = SafeStatus::new();
    threader.threader_for_blocked(n_rows, block_rows(threader, table), |rows| {
        if status.is_ok() {
            status.record(row_norm_block(table, &out, rows, finish));
        }
    })?;
    status.into_result()?;
    Ok(out)
}

fn row_norm_block(
    table: &dyn NumericTable,
    out: &dyn NumericTable,
    rows: Range<usize>,
    finish: fn(f64) -> f64,
) -> Result<(), Status> {
    let mut input = ReadRows::<f64>::new(table, rows.start, rows.len())?;
    let mut norms = WriteOnlyRows::<f64>::new(out, rows.start, rows.len())?;
    for (i, n) in norms.get_mut().iter_mut().enumerate() {
        *n = finish(squared(input.row(i)));
    }
    norms.release()?;
    input.release()
}

/// Fold every row into a per-worker `f64`, then combine the partials.
fn reduce(
    threader: &Threader,
    table: &dyn NumericTable,
    init: f64,
    fold: fn(f64, &[f64]) -> f64,
    combine: fn(f64, f64) -> f64,
) -> Result<f64, Status> {
    check_numeric_table(table, &CheckOptions::new("table"))?;
    let status = SafeStatus::new();
    let tls = Tls::new(move || init);
    threader.threader_reduce(table.n_rows(), block_rows(threader, table), &tls, |acc, rows| {
        if !status.is_ok() {
            return;
        }
        if let Some(v) = status.record(fold_block(table, rows, *acc, fold)) {
            *acc = v;
        }
    })?;
    status.into_result()?;
    Ok(tls.reduce(init, combine))
}

fn fold_block(
    table: &dyn NumericTable,
    rows: Range<usize>,
    mut acc: f64,
    fold: fn(f64, &[f64]) -> f64,
) -> Result<f64, Status> {
    let mut block = ReadRows::<f64>::new(table, rows.start, rows.len())?;
    for i in 0..block.n_rows() {
        acc = fold(acc, block.row(i));
    }
    block.release()?;
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{AnyVec, ErrorId};
    use tabula_table::{CsrNumericTable, SoaNumericTable};
    use tabula_threading::ThreadingConfig;

    fn dense() -> HomogenNumericTable<f64> {
        HomogenNumericTable::from_vec(vec![3.0, 4.0, 0.0, -1.0, 2.0, -2.0], 3, 2).unwrap()
    }

    #[test]
    fn row_norms_of_dense_table() {
        let t = dense();
        assert_eq!(row_squared_l2_norms(&t).unwrap().to_vec().unwrap(), vec![25.0, 1.0, 8.0]);
        let l2 = row_l2_norms(&t).unwrap().to_vec().unwrap();
        assert_eq!(l2[0], 5.0);
        assert_eq!(l2[1], 1.0);
        assert!((l2[2] - 8f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn table_norms_agree_across_layouts() {
        let soa = SoaNumericTable::from_columns(vec![
            AnyVec::F32(vec![3.0, 0.0, 2.0]),
            AnyVec::I32(vec![4, -1, -2]),
        ])
        .unwrap();
        let csr = CsrNumericTable::from_dense(&[3.0f64, 4.0, 0.0, -1.0, 2.0, -2.0], 3, 2).unwrap();
        for t in [&dense() as &dyn NumericTable, &soa, &csr] {
            assert_eq!(frobenius_norm(t).unwrap(), 34f64.sqrt());
            assert_eq!(max_abs_norm(t).unwrap(), 4.0);
        }
    }

    #[test]
    fn eight_threads_match_one_thread() {
        let n = 5000;
        let values: Vec<f64> = (0..n * 3).map(|i| ((i % 17) as f64) - 8.0).collect();
        let t = HomogenNumericTable::from_vec(values, n, 3).unwrap();
        let one = Threader::new(&ThreadingConfig::with_threads(1)).unwrap();
        let many = Threader::new(&ThreadingConfig {
            num_threads: Some(8),
            min_block_rows: 1,
        })
        .unwrap();
        assert_eq!(
            row_squared_l2_norms_with(&one, &t).unwrap().to_vec().unwrap(),
            row_squared_l2_norms_with(&many, &t).unwrap().to_vec().unwrap()
        );
        assert_eq!(max_abs_norm_with(&many, &t).unwrap(), 8.0);
        // Integer squares sum exactly in any order.
        assert_eq!(
            frobenius_norm_with(&one, &t).unwrap(),
            frobenius_norm_with(&many, &t).unwrap()
        );
    }

    #[test]
    fn nan_survives_max_abs() {
        let t = HomogenNumericTable::from_vec(vec![1.0, f64::NAN, 7.0], 3, 1).unwrap();
        assert!(max_abs_norm(&t).unwrap().is_nan());
        assert_eq!(max_nan(f64::NAN, 3.0).to_bits(), f64::NAN.to_bits());
    }

    #[test]
    fn empty_rows_give_empty_results() {
        let t = HomogenNumericTable::<f64>::zeroed(0, 4).unwrap();
        assert_eq!(row_l2_norms(&t).unwrap().n_rows(), 0);
        assert_eq!(frobenius_norm(&t).unwrap(), 0.0);
        assert_eq!(max_abs_norm(&t).unwrap(), 0.0);
    }

    #[test]
    fn unallocated_table_is_rejected() {
        let t = HomogenNumericTable::<f64>::unallocated(4, 2);
        let err = frobenius_norm(&t).unwrap_err();
        assert!(err.contains(ErrorId::NullNumericTable));
    }
}
