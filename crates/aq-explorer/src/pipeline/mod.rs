//! Pipeline module.
//!
//! This module provides the cleaning pipeline and the outlier filter it uses.

mod builder;
pub mod outliers;

pub use builder::{CleaningPipeline, CleaningPipelineBuilder, clean};
pub use outliers::{OutlierBounds, OutlierFilter};
