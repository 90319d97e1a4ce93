//! Scoped, typed block accessors.
//!
//! An accessor acquires one block on construction and releases it on
//! drop, so a kernel cannot forget to release (or write back) a block
//! even on early return:
//!
//! ```
//! use tabula_core::Status;
//! use tabula_table::{HomogenNumericTable, ReadRows, WriteOnlyRows};
//!
//! # fn main() -> Result<(), Status> {
//! let src = HomogenNumericTable::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], 2, 2)?;
//! let dst = HomogenNumericTable::<f32>::zeroed(2, 2)?;
//! {
//!     let rows = ReadRows::<f64>::new(&src, 0, 2)?;
//!     let mut out = WriteOnlyRows::<f32>::new(&dst, 0, 2)?;
//!     for (o, v) in out.get_mut().iter_mut().zip(rows.get()) {
//!         *o = (*v * 2.0) as f32;
//!     }
//!     out.release()?;
//! }
//! assert_eq!(dst.to_vec()?, vec![2.0, 4.0, 6.0, 8.0]);
//! # Ok(())
//! # }
//! ```
//!
//! Row requests are clamped to the table: asking for `n` rows from
//! `start` yields `min(n, n_rows - start)` rows.

use tabula_core::{NumericValue, ReadWriteMode, Status};

use crate::block::{BlockDescriptor, CsrBlock};
use crate::table::{clamp_rows, NumericTable, NumericTableExt};

#[derive(Clone, Copy, Debug)]
enum Target {
    Rows,
    Column(usize),
}

/// Shared machinery of the dense accessors.
struct Held<'a, T: NumericValue> {
    table: &'a dyn NumericTable,
    target: Target,
    mode: ReadWriteMode,
    block: Option<BlockDescriptor<'a, T>>,
}

impl<'a, T: NumericValue> Held<'a, T> {
    fn acquire(
        table: &'a dyn NumericTable,
        target: Target,
        mode: ReadWriteMode,
        start: usize,
        n: usize,
    ) -> Result<Self, Status> {
        let mut held = Self {
            table,
            target,
            mode,
            block: None,
        };
        held.next(start, n)?;
        Ok(held)
    }

    fn next(&mut self, start: usize, n: usize) -> Result<(), Status> {
        self.release()?;
        let rows = clamp_rows(self.table.n_rows(), start, n)?;
        tracing::trace!(target_kind = ?self.target, start = rows.start, n = rows.len(), mode = ?self.mode, "acquire block");
        let block = match self.target {
            Target::Rows => self.table.rows::<T>(rows, self.mode)?,
            Target::Column(col) => self.table.column::<T>(col, rows, self.mode)?,
        };
        self.block = Some(block);
        Ok(())
    }

    fn get(&self) -> &[T] {
        self.block.as_ref().map_or(&[][..], BlockDescriptor::as_slice)
    }

    fn get_mut(&mut self) -> &mut [T] {
        self.block
            .as_mut()
            .and_then(BlockDescriptor::as_mut_slice)
            .unwrap_or(&mut [])
    }

    fn block(&self) -> Option<&BlockDescriptor<'a, T>> {
        self.block.as_ref()
    }

    fn release(&mut self) -> Result<(), Status> {
        let Some(block) = self.block.take() else {
            return Ok(());
        };
        match self.target {
            Target::Rows => self.table.release_block_of_rows(block.into_raw()),
            Target::Column(_) => self.table.release_block_of_column_values(block.into_raw()),
        }
    }
}

impl<T: NumericValue> Drop for Held<'_, T> {
    fn drop(&mut self) {
        if let Err(status) = self.release() {
            tracing::warn!(%status, "block release failed on drop");
        }
    }
}

macro_rules! common_accessor_methods {
    () => {
        /// The current block contents; empty after release.
        pub fn get(&self) -> &[T] {
            self.held.get()
        }

        /// The current block, if held.
        pub fn block(&self) -> Option<&BlockDescriptor<'a, T>> {
            self.held.block()
        }

        /// Number of rows in the current block (0 after release).
        pub fn n_rows(&self) -> usize {
            self.held.block().map_or(0, BlockDescriptor::n_rows)
        }

        /// First table row of the current block.
        pub fn row_offset(&self) -> usize {
            self.held.block().map_or(0, BlockDescriptor::row_offset)
        }

        /// Release the current block and acquire `n` rows from `start`.
        pub fn next(&mut self, start: usize, n: usize) -> Result<(), Status> {
            self.held.next(start, n)
        }

        /// Release the current block now, returning the write-back status.
        pub fn release(&mut self) -> Result<(), Status> {
            self.held.release()
        }
    };
}

/// Read access to a range of rows.
pub struct ReadRows<'a, T: NumericValue> {
    held: Held<'a, T>,
}

impl<'a, T: NumericValue> ReadRows<'a, T> {
    /// Acquire `n` rows from `start`.
    pub fn new(table: &'a dyn NumericTable, start: usize, n: usize) -> Result<Self, Status> {
        Ok(Self {
            held: Held::acquire(table, Target::Rows, ReadWriteMode::Read, start, n)?,
        })
    }

    /// Row `i` of the current block.
    pub fn row(&self, i: usize) -> &[T] {
        let n = self.held.table.n_cols();
        &self.get()[i * n..(i + 1) * n]
    }

    common_accessor_methods!();
}

/// Read-write access to a range of rows. The block is filled from the
/// table and written back on release.
pub struct WriteRows<'a, T: NumericValue> {
    held: Held<'a, T>,
}

impl<'a, T: NumericValue> WriteRows<'a, T> {
    /// Acquire `n` rows from `start`.
    pub fn new(table: &'a dyn NumericTable, start: usize, n: usize) -> Result<Self, Status> {
        Ok(Self {
            held: Held::acquire(table, Target::Rows, ReadWriteMode::ReadWrite, start, n)?,
        })
    }

    /// Mutable block contents.
    pub fn get_mut(&mut self) -> &mut [T] {
        self.held.get_mut()
    }

    common_accessor_methods!();
}

/// Write-only access to a range of rows. A converted block starts
/// zeroed and is written back on release.
pub struct WriteOnlyRows<'a, T: NumericValue> {
    held: Held<'a, T>,
}

impl<'a, T: NumericValue> WriteOnlyRows<'a, T> {
    /// Acquire `n` rows from `start`.
    pub fn new(table: &'a dyn NumericTable, start: usize, n: usize) -> Result<Self, Status> {
        Ok(Self {
            held: Held::acquire(table, Target::Rows, ReadWriteMode::Write, start, n)?,
        })
    }

    /// Mutable block contents.
    pub fn get_mut(&mut self) -> &mut [T] {
        self.held.get_mut()
    }

    common_accessor_methods!();
}

/// Read access to one column over a range of rows.
pub struct ReadColumns<'a, T: NumericValue> {
    held: Held<'a, T>,
}

impl<'a, T: NumericValue> ReadColumns<'a, T> {
    /// Acquire `n` values of column `col` from row `start`.
    pub fn new(
        table: &'a dyn NumericTable,
        col: usize,
        start: usize,
        n: usize,
    ) -> Result<Self, Status> {
        Ok(Self {
            held: Held::acquire(table, Target::Column(col), ReadWriteMode::Read, start, n)?,
        })
    }

    common_accessor_methods!();
}

/// Write-only access to one column over a range of rows.
pub struct WriteOnlyColumns<'a, T: NumericValue> {
    held: Held<'a, T>,
}

impl<'a, T: NumericValue> WriteOnlyColumns<'a, T> {
    /// Acquire `n` values of column `col` from row `start`.
    pub fn new(
        table: &'a dyn NumericTable,
        col: usize,
        start: usize,
        n: usize,
    ) -> Result<Self, Status> {
        Ok(Self {
            held: Held::acquire(table, Target::Column(col), ReadWriteMode::Write, start, n)?,
        })
    }

    /// Mutable block contents.
    pub fn get_mut(&mut self) -> &mut [T] {
        self.held.get_mut()
    }

    common_accessor_methods!();
}

/// Read access to a range of CSR rows.
pub struct ReadRowsCsr<'a, T: NumericValue> {
    table: &'a dyn NumericTable,
    block: Option<CsrBlock<'a, T>>,
}

impl<'a, T: NumericValue> ReadRowsCsr<'a, T> {
    /// Acquire `n` rows from `start`; fails with
    /// [`ErrorId::MethodNotSupported`](tabula_core::ErrorId::MethodNotSupported)
    /// on non-CSR tables.
    pub fn new(table: &'a dyn NumericTable, start: usize, n: usize) -> Result<Self, Status> {
        let mut acc = Self { table, block: None };
        acc.next(start, n)?;
        Ok(acc)
    }

    /// Release the current block and acquire `n` rows from `start`.
    pub fn next(&mut self, start: usize, n: usize) -> Result<(), Status> {
        self.block = None;
        let rows = clamp_rows(self.table.n_rows(), start, n)?;
        self.block = Some(self.table.sparse_rows::<T>(rows)?);
        Ok(())
    }

    /// The current sparse block.
    pub fn block(&self) -> Option<&CsrBlock<'a, T>> {
        self.block.as_ref()
    }

    /// Stored values of the current block.
    pub fn values(&self) -> &[T] {
        self.block.as_ref().map_or(&[][..], CsrBlock::values)
    }

    /// One-based column indices of the current block.
    pub fn col_indices(&self) -> &[usize] {
        self.block.as_ref().map_or(&[][..], CsrBlock::col_indices)
    }

    /// One-based row offsets of the current block, starting at 1.
    pub fn row_offsets(&self) -> &[usize] {
        self.block.as_ref().map_or(&[][..], CsrBlock::row_offsets)
    }

    /// Release the current block.
    pub fn release(&mut self) {
        self.block = None;
    }
}
