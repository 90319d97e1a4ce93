//! Core types for the Tabula numeric-table framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by tables, dispatch, threading and kernels:
//! error classification ([`ErrorId`], [`Error`], [`Status`]), the
//! thread-safe [`SafeStatus`] accumulator, the value types a table can
//! store ([`NumericValue`], [`DataType`]) and table metadata
//! ([`StorageLayout`], [`Dictionary`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dictionary;
pub mod error;
pub mod layout;
pub mod safe_status;
pub mod status;
pub mod value;

pub use dictionary::{Dictionary, FeatureInfo, FeatureKind};
pub use error::{Error, ErrorDetail, ErrorId};
pub use layout::{MemoryStatus, ReadWriteMode, StorageLayout, TableDims};
pub use safe_status::SafeStatus;
pub use status::Status;
pub use value::{AnySlice, AnySliceMut, AnyVec, DataType, NumericValue, Stride};
