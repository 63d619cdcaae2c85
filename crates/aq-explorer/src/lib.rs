//! Air-Quality Explorer Library
//!
//! A cleaning pipeline and interactive query engine for tabular air-quality
//! data, built on Polars.
//!
//! # Overview
//!
//! - **Cleaning Pipeline**: null audit, date/type coercion, column pruning,
//!   sequential Tukey outlier filtering and null elimination, with
//!   diagnostics for every stage
//! - **Predicate Filters**: set, numeric-range and date-range predicates
//!   composed into a single pass over the clean dataset
//! - **Aggregation**: grouped means and per-group summary statistics
//! - **Chart Data & Comparison**: tables shaped for line, bar, box, scatter
//!   and summary views, with deterministic export filenames
//! - **Session**: owns the raw dataset and derives the clean one once
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use aq_explorer::{FilterSpec, Metric, Session};
//! use polars::prelude::*;
//!
//! let raw = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("Air_Quality.csv".into()))?
//!     .finish()?;
//!
//! let session = Session::new(raw);
//! println!("{} clean rows", session.clean()?.height());
//!
//! let spec = FilterSpec::new()
//!     .cities(["Delhi", "Lagos"])
//!     .range(Metric::Aqi, 0.0, 100.0);
//! let filtered = session.filter(&spec)?;
//! let filename = session.filter_filename(&spec);
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use aq_explorer::{CleaningConfig, Session};
//!
//! let config = CleaningConfig::builder()
//!     .drop_columns(["CO2"])
//!     .iqr_multiplier(1.5)
//!     .date_format("%d/%m/%Y")
//!     .build()?;
//!
//! let session = Session::with_config(raw, config)?;
//! ```

pub mod chart;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod quality;
pub mod query;
pub mod schema;
pub mod session;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use chart::{ChartData, ChartKind, ChartRequest, ComparisonRequest};
pub use cleaner::DataCleaner;
pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigValidationError};
pub use error::{ExplorerError, Result, ResultExt};
pub use pipeline::{CleaningPipeline, CleaningPipelineBuilder, OutlierBounds, OutlierFilter, clean};
pub use quality::DataQualityAnalyzer;
pub use query::{AggregationKind, AggregationSpec, FilterSpec, Predicate};
pub use schema::{ColumnCatalog, ColumnRole, Metric};
pub use session::{CleanDataset, Session};
pub use types::{
    CleaningDiagnostics, CleaningStage, CoercionIssue, ColumnInfo, DatasetInfo, NullAudit,
    OutlierReport, StageReport,
};
