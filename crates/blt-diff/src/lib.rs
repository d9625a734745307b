//! Structural diff for build-log trees.
//!
//! Certifies that a conversion between formats preserved meaning, and
//! explains where it did not.
//!
//! # Key Types
//!
//! - [`first_mismatch`] / [`Mismatch`] -- first node, in document order,
//!   whose kind, name, value or child count differs
//! - [`are_different`] / [`are_different_files`] -- the boolean oracle over
//!   text documents
//! - [`render_report`] / [`Report`] -- line-level diff of outline renderings

pub mod compare;
pub mod error;
pub mod report;

pub use compare::{
    are_different, are_different_files, are_different_trees, first_mismatch, Mismatch,
    MismatchReason,
};
pub use error::{DiffError, DiffResult};
pub use report::{render_report, Hunk, Report, ReportLine};
