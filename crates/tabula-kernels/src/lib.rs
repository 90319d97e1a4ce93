//! Reduction kernels over Tabula numeric tables.
//!
//! Every kernel takes tables as `&dyn NumericTable`, reads them through
//! the typed block accessors, and splits the row range into blocks that a
//! [`Threader`](tabula_threading::Threader) hands to scoped workers.
//! Per-worker partials are reduced after the join and per-block failures
//! are collected in a [`SafeStatus`](tabula_core::SafeStatus), so the
//! first failing block never hides the others.
//!
//! - [`finiteness`]: [`all_values_are_finite`] with SIMD variants chosen
//!   through a [`DispatchTable`](tabula_dispatch::DispatchTable).
//! - [`kmeans`]: initialization, Lloyd steps, postprocessing and a `fit`
//!   driver.
//! - [`norms`]: per-row and whole-table norms.
//!
//! Each kernel has a variant running on the process-wide
//! [`Threader::global`](tabula_threading::Threader::global) and one
//! taking an explicit threader.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod finiteness;
pub mod kmeans;
pub mod norms;

pub use finiteness::{all_values_are_finite, all_values_are_finite_with};
