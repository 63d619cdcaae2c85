//! Data quality inspection module.
//!
//! Read-only views of a dataset: per-column null audit, dtype/non-null info
//! and a raw preview. None of these mutate the data.

mod analyzer;

pub use analyzer::{DEFAULT_PREVIEW_ROWS, DataQualityAnalyzer};
