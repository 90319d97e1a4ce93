//! Integration test: accessor round-trips across layouts and value types.
//!
//! Writing a range through `WriteOnlyRows` and reading it back through
//! `ReadRows` must return exactly what was written, whether the block
//! was a zero-copy view or a converted copy scattered back on release.

use proptest::prelude::*;
use tabula_core::{DataType, ErrorId, NumericValue};
use tabula_table::{NumericTable, ReadColumns, ReadRows, WriteOnlyRows, WriteRows};
use tabula_test_utils::{build_table_as, mixed_soa, TableLayout};

fn storage_types() -> impl Strategy<Value = DataType> {
    prop_oneof![Just(DataType::F32), Just(DataType::F64), Just(DataType::I32)]
}

fn writable_layouts() -> impl Strategy<Value = TableLayout> {
    prop_oneof![Just(TableLayout::RowMajor), Just(TableLayout::Soa)]
}

/// Small integers survive every conversion exactly.
fn integral_values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((-1000i32..1000).prop_map(f64::from), len)
}

fn write_then_read<T: NumericValue>(
    table: &dyn NumericTable,
    start: usize,
    values: &[T],
) -> Vec<T> {
    {
        let mut w = WriteOnlyRows::<T>::new(table, start, values.len() / table.n_cols()).unwrap();
        w.get_mut().copy_from_slice(values);
        w.release().unwrap();
    }
    let r = ReadRows::<T>::new(table, start, values.len() / table.n_cols()).unwrap();
    r.get().to_vec()
}

proptest! {
    #[test]
    fn write_only_then_read_returns_written_f64(
        storage in storage_types(),
        layout in writable_layouts(),
        (n_rows, n_cols, start, n) in (1usize..24, 1usize..5)
            .prop_flat_map(|(r, c)| (Just(r), Just(c), 0..r))
            .prop_flat_map(|(r, c, s)| (Just(r), Just(c), Just(s), 1..=(r - s))),
        seed_values in integral_values(24 * 5),
    ) {
        let table = build_table_as(storage, layout, &vec![0.0; n_rows * n_cols], n_rows, n_cols);
        let values = &seed_values[..n * n_cols];
        let back = write_then_read::<f64>(table.as_ref(), start, values);
        prop_assert_eq!(back.as_slice(), values);
    }

    #[test]
    fn write_only_then_read_returns_written_i32(
        storage in storage_types(),
        layout in writable_layouts(),
        n_rows in 1usize..16,
        seed_values in integral_values(16 * 3),
    ) {
        let n_cols = 3;
        let table = build_table_as(storage, layout, &vec![0.0; n_rows * n_cols], n_rows, n_cols);
        let values: Vec<i32> = seed_values[..n_rows * n_cols].iter().map(|&v| v as i32).collect();
        let back = write_then_read::<i32>(table.as_ref(), 0, &values);
        prop_assert_eq!(back, values);
    }

    #[test]
    fn untouched_rows_keep_their_values(
        storage in storage_types(),
        layout in writable_layouts(),
        original in integral_values(8 * 2),
    ) {
        let table = build_table_as(storage, layout, &original, 8, 2);
        write_then_read::<f64>(table.as_ref(), 3, &[1.0, 2.0, 3.0, 4.0]);
        let all = ReadRows::<f64>::new(table.as_ref(), 0, 8).unwrap();
        prop_assert_eq!(&all.get()[..6], &original[..6]);
        prop_assert_eq!(&all.get()[10..], &original[10..]);
    }
}

#[test]
fn csr_rejects_dense_writes() {
    let table = build_table_as(DataType::F64, TableLayout::Csr, &[1.0, 0.0, 0.0, 2.0], 2, 2);
    let err = WriteOnlyRows::<f64>::new(table.as_ref(), 0, 1).err().unwrap();
    assert!(err.contains(ErrorId::MethodNotSupported));
    let rows = ReadRows::<f64>::new(table.as_ref(), 0, 2).unwrap();
    assert_eq!(rows.get(), &[1.0, 0.0, 0.0, 2.0]);
}

#[test]
fn read_write_rows_see_current_values_on_mixed_soa() {
    let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let table = mixed_soa(&data, 2, 3);
    {
        let mut w = WriteRows::<f64>::new(&table, 1, 1).unwrap();
        assert_eq!(w.get(), &[4.0, 5.0, 6.0]);
        for v in w.get_mut() {
            *v += 0.5;
        }
    }
    // The i32 column truncates, the float columns keep the half.
    let col = ReadColumns::<f64>::new(&table, 2, 0, 2).unwrap();
    assert_eq!(col.get(), &[3.0, 6.0]);
    let col = ReadColumns::<f64>::new(&table, 1, 0, 2).unwrap();
    assert_eq!(col.get(), &[2.0, 5.5]);
}
