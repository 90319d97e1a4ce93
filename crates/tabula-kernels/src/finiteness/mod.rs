//! Finiteness checking over any table layout.
//!
//! [`all_values_are_finite`] reports whether a table holds only finite
//! values. Each block is first summed: a finite sum proves the block
//! finite, since any NaN or infinity poisons it. Only blocks whose sum
//! is not finite are scanned element by element with exponent/fraction
//! bit tests, which is also where `allow_nan` takes effect.
//!
//! Access path by table shape:
//!
//! | table | path |
//! |---|---|
//! | integer values | always finite, no access |
//! | CSR | stored values only, in the storage type |
//! | dense `f32`/`f64` | one zero-copy block over the whole buffer |
//! | SOA | per column block in the column's own type |
//! | anything else | row blocks converted to `f64` |

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tabula_core::{DataType, NumericValue, SafeStatus, Status, StorageLayout};
use tabula_dispatch::{CpuType, DispatchTable};
use tabula_table::{NumericTable, ReadColumns, ReadRows, ReadRowsCsr};
use tabula_threading::{Threader, Tls};

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod avx512;
mod scalar;

/// One dispatch entry: block sum and element-wise scan.
#[derive(Clone, Copy)]
pub(crate) struct Kernels<T> {
    sum: fn(&[T]) -> T,
    any_non_finite: fn(&[T], bool) -> bool,
}

impl<T: NumericValue> Kernels<T> {
    fn block_has_non_finite(&self, block: &[T], allow_nan: bool) -> bool {
        !(self.sum)(block).is_finite_value() && (self.any_non_finite)(block, allow_nan)
    }
}

/// Float storage types with dispatched kernels.
pub(crate) trait FloatValue: NumericValue {
    /// Every registered variant.
    fn dispatch_table() -> &'static DispatchTable<Kernels<Self>>;

    /// The variant for the effective CPU type, resolved once.
    fn kernels() -> Kernels<Self>;
}

macro_rules! float_kernels {
    ($ty:ty, $name:literal, $sum:ident, $scan:ident) => {
        impl FloatValue for $ty {
            fn dispatch_table() -> &'static DispatchTable<Kernels<Self>> {
                static TABLE: OnceLock<DispatchTable<Kernels<$ty>>> = OnceLock::new();
                TABLE.get_or_init(|| {
                    let table = DispatchTable::new(
                        $name,
                        Kernels {
                            sum: scalar::$sum,
                            any_non_finite: scalar::$scan,
                        },
                    );
                    #[cfg(target_arch = "x86_64")]
                    let table = table
                        .with(
                            CpuType::Avx2,
                            Kernels {
                                sum: avx2::$sum,
                                any_non_finite: avx2::$scan,
                            },
                        )
                        .with(
                            CpuType::Avx512,
                            Kernels {
                                sum: avx512::$sum,
                                any_non_finite: avx512::$scan,
                            },
                        );
                    table
                })
            }

            fn kernels() -> Kernels<Self> {
                static RESOLVED: OnceLock<Kernels<$ty>> = OnceLock::new();
                *RESOLVED.get_or_init(|| Self::dispatch_table().resolve())
            }
        }
    };
}

float_kernels!(f64, "finiteness_f64", sum_f64, any_non_finite_f64);
float_kernels!(f32, "finiteness_f32", sum_f32, any_non_finite_f32);

/// Whether every value of `table` is finite, on the global threader.
///
/// With `allow_nan`, NaN values are tolerated and only infinities fail.
/// Empty tables and integer tables are finite.
pub fn all_values_are_finite(table: &dyn NumericTable, allow_nan: bool) -> Result<bool, Status> {
    all_values_are_finite_with(Threader::global(), table, allow_nan)
}

/// [`all_values_are_finite`] on an explicit threader.
pub fn all_values_are_finite_with(
    threader: &Threader,
    table: &dyn NumericTable,
    allow_nan: bool,
) -> Result<bool, Status> {
    if table.dims().is_empty() {
        return Ok(true);
    }
    let data_type = table.dictionary().common_data_type();
    if data_type == Some(DataType::I32) {
        return Ok(true);
    }
    let csr = table.as_csr().is_some();
    tracing::trace!(layout = %table.layout(), ?data_type, csr, "finiteness check");
    let non_finite = match (table.layout(), data_type) {
        _ if csr => match data_type {
            Some(DataType::F32) => csr_has_non_finite::<f32>(threader, table, allow_nan)?,
            _ => csr_has_non_finite::<f64>(threader, table, allow_nan)?,
        },
        (StorageLayout::RowMajor, Some(DataType::F32)) => {
            dense_has_non_finite::<f32>(threader, table, allow_nan)?
        }
        (StorageLayout::RowMajor, Some(DataType::F64)) => {
            dense_has_non_finite::<f64>(threader, table, allow_nan)?
        }
        (StorageLayout::Soa, _) => soa_has_non_finite(threader, table, allow_nan)?,
        _ => rows_have_non_finite(threader, table, allow_nan)?,
    };
    Ok(!non_finite)
}

fn dense_has_non_finite<T: FloatValue>(
    threader: &Threader,
    table: &dyn NumericTable,
    allow_nan: bool,
) -> Result<bool, Status> {
    let mut rows = ReadRows::<T>::new(table, 0, table.n_rows())?;
    let found = slice_has_non_finite(threader, rows.get(), allow_nan)?;
    rows.release()?;
    Ok(found)
}

fn csr_has_non_finite<T: FloatValue>(
    threader: &Threader,
    table: &dyn NumericTable,
    allow_nan: bool,
) -> Result<bool, Status> {
    let mut rows = ReadRowsCsr::<T>::new(table, 0, table.n_rows())?;
    let found = slice_has_non_finite(threader, rows.values(), allow_nan)?;
    rows.release();
    Ok(found)
}

fn slice_has_non_finite<T: FloatValue>(
    threader: &Threader,
    data: &[T],
    allow_nan: bool,
) -> Result<bool, Status> {
    let kernels = T::kernels();
    let block = threader.block_rows(data.len(), 1, T::DATA_TYPE.size_bytes(), None);
    any_task(threader, data.len().div_ceil(block), |t| {
        let range = block_range(t, block, data.len());
        Ok(kernels.block_has_non_finite(&data[range], allow_nan))
    })
}

fn soa_has_non_finite(
    threader: &Threader,
    table: &dyn NumericTable,
    allow_nan: bool,
) -> Result<bool, Status> {
    let n_rows = table.n_rows();
    let columns: Vec<(usize, DataType)> = table
        .dictionary()
        .features()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.data_type.is_float())
        .map(|(j, f)| (j, f.data_type))
        .collect();
    let block = threader.block_rows(n_rows, 1, DataType::F64.size_bytes(), None);
    let blocks_per_column = n_rows.div_ceil(block);
    any_task(threader, columns.len() * blocks_per_column, |t| {
        let (col, data_type) = columns[t / blocks_per_column];
        let start = (t % blocks_per_column) * block;
        match data_type {
            DataType::F32 => column_has_non_finite::<f32>(table, col, start, block, allow_nan),
            DataType::F64 => column_has_non_finite::<f64>(table, col, start, block, allow_nan),
            DataType::I32 => Ok(false),
        }
    })
}

fn column_has_non_finite<T: FloatValue>(
    table: &dyn NumericTable,
    col: usize,
    start: usize,
    n: usize,
    allow_nan: bool,
) -> Result<bool, Status> {
    let mut column = ReadColumns::<T>::new(table, col, start, n)?;
    let found = T::kernels().block_has_non_finite(column.get(), allow_nan);
    column.release()?;
    Ok(found)
}

fn rows_have_non_finite(
    threader: &Threader,
    table: &dyn NumericTable,
    allow_nan: bool,
) -> Result<bool, Status> {
    let n_rows = table.n_rows();
    let block = threader.block_rows(n_rows, table.n_cols(), DataType::F64.size_bytes(), None);
    let kernels = f64::kernels();
    any_task(threader, n_rows.div_ceil(block), |t| {
        let mut rows = ReadRows::<f64>::new(table, t * block, block)?;
        let found = kernels.block_has_non_finite(rows.get(), allow_nan);
        rows.release()?;
        Ok(found)
    })
}

/// Run `task(t)` for `t` in `0..n_tasks` until one reports a non-finite
/// value. Each worker keeps its verdict in TLS; errors are collected in a
/// [`SafeStatus`] and take precedence over the verdict.
fn any_task<F>(threader: &Threader, n_tasks: usize, task: F) -> Result<bool, Status>
where
    F: Fn(usize) -> Result<bool, Status> + Sync,
{
    let status = SafeStatus::new();
    let stop = AtomicBool::new(false);
    let tls = Tls::new(|| false);
    threader.threader_reduce(n_tasks, 1, &tls, |found, tasks| {
        for t in tasks {
            if *found || stop.load(Ordering::Relaxed) || !status.is_ok() {
                return;
            }
            if status.record(task(t)) == Some(true) {
                *found = true;
                stop.store(true, Ordering::Relaxed);
            }
        }
    })?;
    status.into_result()?;
    Ok(tls.reduce(false, |acc, found| acc || found))
}

fn block_range(block: usize, size: usize, len: usize) -> Range<usize> {
    let start = block * size;
    start..(start + size).min(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{AnyVec, ErrorId};
    use tabula_dispatch::detected_cpu_type;
    use tabula_table::{CsrNumericTable, HomogenNumericTable, SoaNumericTable};
    use tabula_threading::ThreadingConfig;

    fn threader() -> Threader {
        Threader::new(&ThreadingConfig::with_threads(4)).unwrap()
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.37).sin() * 1e3).collect()
    }

    #[test]
    fn every_variant_agrees_with_scalar() {
        let base = ramp(67);
        for cpu in CpuType::ALL {
            let (tier, k64) = f64::dispatch_table().resolve_for(cpu);
            let (_, k32) = f32::dispatch_table().resolve_for(cpu);
            assert!(tier <= detected_cpu_type());
            let expected: f64 = base.iter().sum();
            assert!(((k64.sum)(&base) - expected).abs() < 1e-6);
            for pos in [0, 3, 31, 64, 66] {
                for special in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                    let mut x = base.clone();
                    x[pos] = special;
                    let x32: Vec<f32> = x.iter().map(|&v| v as f32).collect();
                    let strict = true;
                    let lenient = !special.is_nan();
                    assert_eq!((k64.any_non_finite)(&x, false), strict, "{tier} {pos}");
                    assert_eq!((k64.any_non_finite)(&x, true), lenient, "{tier} {pos}");
                    assert_eq!((k32.any_non_finite)(&x32, false), strict, "{tier} {pos}");
                    assert_eq!((k32.any_non_finite)(&x32, true), lenient, "{tier} {pos}");
                }
            }
            assert!(!(k64.any_non_finite)(&base, false));
        }
    }

    #[test]
    fn dense_table_with_inf_is_not_finite() {
        let mut data = ramp(40_000);
        let t = HomogenNumericTable::from_vec(data.clone(), 10_000, 4).unwrap();
        assert!(all_values_are_finite_with(&threader(), &t, false).unwrap());
        data[39_999] = f64::INFINITY;
        let t = HomogenNumericTable::from_vec(data, 10_000, 4).unwrap();
        assert!(!all_values_are_finite_with(&threader(), &t, false).unwrap());
        assert!(!all_values_are_finite_with(&threader(), &t, true).unwrap());
    }

    #[test]
    fn nan_is_tolerated_only_when_allowed() {
        let mut data = ramp(12);
        data[5] = f64::NAN;
        let t = HomogenNumericTable::from_vec(data, 4, 3).unwrap();
        assert!(!all_values_are_finite(&t, false).unwrap());
        assert!(all_values_are_finite(&t, true).unwrap());
    }

    #[test]
    fn overflowing_sum_of_finite_values_is_finite() {
        let t = HomogenNumericTable::from_vec(vec![f32::MAX; 64], 16, 4).unwrap();
        assert!(all_values_are_finite_with(&threader(), &t, false).unwrap());
    }

    #[test]
    fn integer_and_empty_tables_are_finite() {
        let ints = HomogenNumericTable::from_vec(vec![i32::MAX, i32::MIN], 1, 2).unwrap();
        assert!(all_values_are_finite(&ints, false).unwrap());
        let empty = HomogenNumericTable::<f64>::from_vec(Vec::new(), 0, 3).unwrap();
        assert!(all_values_are_finite(&empty, false).unwrap());
    }

    #[test]
    fn soa_checks_each_column_in_its_own_type() {
        let t = SoaNumericTable::from_columns(vec![
            AnyVec::F64(vec![1.0, 2.0, 3.0]),
            AnyVec::I32(vec![1, 2, 3]),
            AnyVec::F32(vec![1.0, f32::NEG_INFINITY, 3.0]),
        ])
        .unwrap();
        assert!(!all_values_are_finite_with(&threader(), &t, true).unwrap());
        let t = SoaNumericTable::from_columns(vec![
            AnyVec::F64(vec![1.0, f64::NAN]),
            AnyVec::F32(vec![1.0, 2.0]),
        ])
        .unwrap();
        assert!(all_values_are_finite_with(&threader(), &t, true).unwrap());
        assert!(!all_values_are_finite_with(&threader(), &t, false).unwrap());
    }

    #[test]
    fn csr_checks_stored_values() {
        let t = CsrNumericTable::new(vec![1.0f32, f32::NAN], vec![1, 3], vec![1, 2, 3], 3).unwrap();
        assert!(!all_values_are_finite(&t, false).unwrap());
        assert!(all_values_are_finite(&t, true).unwrap());
    }

    #[test]
    fn unallocated_table_is_an_error() {
        let t = HomogenNumericTable::<f64>::unallocated(3, 3);
        let status = all_values_are_finite(&t, false).unwrap_err();
        assert!(status.contains(ErrorId::NullNumericTable));
    }
}
