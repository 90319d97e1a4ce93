//! Input table validation shared by kernels.

use tabula_core::{Error, ErrorId, MemoryStatus, Status, StorageLayout};

use crate::table::NumericTable;

/// What [`check_numeric_table`] requires of a table.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Argument name attached to every reported error.
    pub argument: String,
    /// Exact column count.
    pub n_cols: Option<usize>,
    /// Exact row count.
    pub n_rows: Option<usize>,
    /// Minimum row count.
    pub min_rows: usize,
    /// Layouts the table must not have.
    pub unexpected_layouts: Vec<StorageLayout>,
    /// Layout the table must have.
    pub expected_layout: Option<StorageLayout>,
}

impl CheckOptions {
    /// Options reporting errors against `argument`, with no constraints.
    pub fn new(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            ..Self::default()
        }
    }

    /// Require exactly `n` columns.
    pub fn n_cols(mut self, n: usize) -> Self {
        self.n_cols = Some(n);
        self
    }

    /// Require exactly `n` rows.
    pub fn n_rows(mut self, n: usize) -> Self {
        self.n_rows = Some(n);
        self
    }

    /// Require at least `n` rows.
    pub fn min_rows(mut self, n: usize) -> Self {
        self.min_rows = n;
        self
    }

    /// Reject tables stored as `layout`.
    pub fn reject_layout(mut self, layout: StorageLayout) -> Self {
        self.unexpected_layouts.push(layout);
        self
    }

    /// Require tables stored as `layout`.
    pub fn expect_layout(mut self, layout: StorageLayout) -> Self {
        self.expected_layout = Some(layout);
        self
    }
}

/// Check a table against `opts`, reporting every violated constraint.
///
/// An unallocated table fails with [`ErrorId::NullNumericTable`] alone.
pub fn check_numeric_table(table: &dyn NumericTable, opts: &CheckOptions) -> Result<(), Status> {
    let err = |id| Error::new(id).with_argument(opts.argument.clone());
    if table.memory_status() == MemoryStatus::NotAllocated {
        return Err(err(ErrorId::NullNumericTable).into());
    }

    let mut status = Status::ok();
    let layout = table.layout();
    if opts.unexpected_layouts.contains(&layout)
        || opts.expected_layout.is_some_and(|l| l != layout)
    {
        status.add(err(ErrorId::UnsupportedLayout).with_message(format!("layout {layout}")));
    }
    if let Some(n) = opts.n_cols {
        if table.n_cols() != n {
            status.add(err(ErrorId::IncorrectNumberOfColumns).with_sizes(n, table.n_cols()));
        }
    } else if table.n_cols() == 0 {
        status.add(err(ErrorId::IncorrectNumberOfColumns).with_message("table has no columns"));
    }
    if let Some(n) = opts.n_rows {
        if table.n_rows() != n {
            status.add(err(ErrorId::IncorrectNumberOfRows).with_sizes(n, table.n_rows()));
        }
    }
    if table.n_rows() < opts.min_rows {
        status.add(
            err(ErrorId::IncorrectNumberOfRows)
                .with_message(format!("at least {} rows required", opts.min_rows))
                .with_sizes(opts.min_rows, table.n_rows()),
        );
    }
    status.into_result()
}
