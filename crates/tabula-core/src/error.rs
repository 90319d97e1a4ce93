//! Error classification for the Tabula framework.
//!
//! Every failure is classified by an [`ErrorId`] with a stable numeric
//! code and carries a short list of typed [`ErrorDetail`]s (argument
//! name, row, column, expected/actual sizes). Several errors combine into
//! a [`Status`](crate::Status).

use std::error::Error as StdError;
use std::fmt;

use smallvec::SmallVec;

/// Classification of an error.
///
/// Codes are ABI-stable negative integers grouped by subsystem:
/// memory (-1..), input validation (-20..), numeric-table layout (-40..),
/// dispatch and threading (-60..) and algorithm-specific (-80..).
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorId {
    /// A buffer could not be allocated.
    MemoryAllocationFailed = -1,
    /// A size computation overflowed `usize`.
    BufferSizeOverflow = -2,

    /// A required table argument was missing or holds no data.
    NullNumericTable = -20,
    /// Column count does not match what the operation expects.
    IncorrectNumberOfColumns = -21,
    /// Row count does not match what the operation expects.
    IncorrectNumberOfRows = -22,
    /// A row or column index lies outside the table.
    IncorrectIndex = -23,
    /// A scalar parameter is out of its valid range.
    IncorrectParameter = -24,
    /// The input holds no observations.
    EmptyInput = -25,
    /// The input contains NaN or infinite values.
    InputContainsNonFinite = -26,

    /// The table layout is not supported by the operation.
    UnsupportedLayout = -40,
    /// The requested value type does not match the block or buffer.
    DataTypeMismatch = -41,
    /// The table does not implement the requested access method.
    MethodNotSupported = -42,
    /// The requested rows are leased by a conflicting block.
    BlockBusy = -43,
    /// CSR row offsets or column indices are inconsistent.
    InconsistentCsrStructure = -44,

    /// A worker thread panicked inside a parallel region.
    ThreadPanicked = -60,
    /// The requested instruction set is not available on this CPU.
    CpuNotSupported = -61,

    /// The number of clusters is zero or exceeds the number of rows.
    IncorrectNumberOfClusters = -80,
    /// An iterative algorithm failed to make progress.
    ConvergenceFailed = -81,
}

impl ErrorId {
    /// Stable numeric code of this error class.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::MemoryAllocationFailed => "memory allocation failed",
            Self::BufferSizeOverflow => "buffer size overflows usize",
            Self::NullNumericTable => "numeric table is missing or not allocated",
            Self::IncorrectNumberOfColumns => "incorrect number of columns",
            Self::IncorrectNumberOfRows => "incorrect number of rows",
            Self::IncorrectIndex => "index out of range",
            Self::IncorrectParameter => "incorrect parameter",
            Self::EmptyInput => "input is empty",
            Self::InputContainsNonFinite => "input contains non-finite values",
            Self::UnsupportedLayout => "unsupported numeric table layout",
            Self::DataTypeMismatch => "data type mismatch",
            Self::MethodNotSupported => "method not supported by this table",
            Self::BlockBusy => "rows are leased by a conflicting block",
            Self::InconsistentCsrStructure => "inconsistent CSR structure",
            Self::ThreadPanicked => "worker thread panicked",
            Self::CpuNotSupported => "instruction set not supported by this CPU",
            Self::IncorrectNumberOfClusters => "incorrect number of clusters",
            Self::ConvergenceFailed => "algorithm failed to converge",
        }
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Typed detail attached to an [`Error`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorDetail {
    /// Name of the offending argument (e.g. `"data"`).
    ArgumentName(String),
    /// Row index involved in the failure.
    Row(usize),
    /// Column index involved in the failure.
    Column(usize),
    /// Expected size or count.
    Expected(usize),
    /// Actual size or count.
    Actual(usize),
    /// Free-form message.
    Message(String),
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentName(name) => write!(f, "argument '{name}'"),
            Self::Row(r) => write!(f, "row {r}"),
            Self::Column(c) => write!(f, "column {c}"),
            Self::Expected(n) => write!(f, "expected {n}"),
            Self::Actual(n) => write!(f, "actual {n}"),
            Self::Message(m) => f.write_str(m),
        }
    }
}

/// A single classified error with optional details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    id: ErrorId,
    details: SmallVec<[ErrorDetail; 2]>,
}

impl Error {
    /// Create an error with no details.
    pub fn new(id: ErrorId) -> Self {
        Self {
            id,
            details: SmallVec::new(),
        }
    }

    /// The error class.
    pub fn id(&self) -> ErrorId {
        self.id
    }

    /// Attached details in insertion order.
    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// Attach an arbitrary detail.
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// Attach the offending argument name.
    pub fn with_argument(self, name: impl Into<String>) -> Self {
        self.with_detail(ErrorDetail::ArgumentName(name.into()))
    }

    /// Attach a row index.
    pub fn with_row(self, row: usize) -> Self {
        self.with_detail(ErrorDetail::Row(row))
    }

    /// Attach a column index.
    pub fn with_column(self, column: usize) -> Self {
        self.with_detail(ErrorDetail::Column(column))
    }

    /// Attach an expected/actual size pair.
    pub fn with_sizes(self, expected: usize, actual: usize) -> Self {
        self.with_detail(ErrorDetail::Expected(expected))
            .with_detail(ErrorDetail::Actual(actual))
    }

    /// Attach a free-form message.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with_detail(ErrorDetail::Message(message.into()))
    }

    /// The argument name detail, if present.
    pub fn argument(&self) -> Option<&str> {
        self.details.iter().find_map(|d| match d {
            ErrorDetail::ArgumentName(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl From<ErrorId> for Error {
    fn from(id: ErrorId) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for (i, detail) in self.details.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{detail}")?;
        }
        Ok(())
    }
}

impl StdError for Error {}
