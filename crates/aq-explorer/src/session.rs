//! Session-scoped ownership of the raw and clean datasets.
//!
//! A [`Session`] holds one raw dataset and derives its clean counterpart on
//! first use. The clean dataset is read-only afterwards and only replaced by
//! an explicit [`Session::reload`].

use chrono::NaiveDate;
use once_cell::unsync::OnceCell;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::info;

use crate::chart::{self, ChartData, ChartRequest, ComparisonRequest};
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::pipeline::CleaningPipeline;
use crate::quality::DataQualityAnalyzer;
use crate::query::{AggregationSpec, FilterSpec, aggregate, filter};
use crate::schema::{CITY_COLUMN, Metric};
use crate::types::{CleaningDiagnostics, DatasetInfo, NullAudit};
use crate::utils::{date_values, float_values, string_values};

/// The analysis-ready dataset and the record of how it was produced.
#[derive(Debug, Clone)]
pub struct CleanDataset {
    data: DataFrame,
    diagnostics: CleaningDiagnostics,
}

static_assertions::assert_impl_all!(CleanDataset: Send, Sync);

impl CleanDataset {
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn diagnostics(&self) -> &CleaningDiagnostics {
        &self.diagnostics
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }
}

/// One analyst's raw dataset and its lazily derived clean form.
pub struct Session {
    pipeline: CleaningPipeline,
    raw: DataFrame,
    clean: OnceCell<CleanDataset>,
}

static_assertions::assert_impl_all!(Session: Send);

impl Session {
    /// Start a session with the default cleaning configuration.
    pub fn new(raw: DataFrame) -> Self {
        Self::with_pipeline(raw, CleaningPipeline::default())
    }

    /// Start a session with a validated configuration.
    pub fn with_config(raw: DataFrame, config: CleaningConfig) -> Result<Self> {
        let pipeline = CleaningPipeline::builder().config(config).build()?;
        Ok(Self::with_pipeline(raw, pipeline))
    }

    fn with_pipeline(raw: DataFrame, pipeline: CleaningPipeline) -> Self {
        Self {
            pipeline,
            raw,
            clean: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &CleaningConfig {
        self.pipeline.config()
    }

    pub fn raw(&self) -> &DataFrame {
        &self.raw
    }

    /// First `n` raw rows.
    pub fn raw_preview(&self, n: usize) -> DataFrame {
        DataQualityAnalyzer::preview(&self.raw, n)
    }

    pub fn raw_info(&self) -> DatasetInfo {
        DataQualityAnalyzer::info(&self.raw)
    }

    /// Null audit of the raw dataset.
    pub fn null_audit(&self) -> Result<Vec<NullAudit>> {
        DataQualityAnalyzer::null_audit(&self.raw, &self.config().catalog)
    }

    /// The clean dataset, cleaning the raw data on first access.
    ///
    /// A failed run publishes nothing; the next call retries.
    pub fn clean(&self) -> Result<&CleanDataset> {
        self.clean.get_or_try_init(|| {
            let (data, diagnostics) = self.pipeline.run(&self.raw)?;
            info!("Session clean dataset ready: {} rows", data.height());
            Ok(CleanDataset { data, diagnostics })
        })
    }

    /// Whether the clean dataset has been derived yet.
    pub fn is_cleaned(&self) -> bool {
        self.clean.get().is_some()
    }

    /// Replace the raw dataset and discard the clean one.
    pub fn reload(&mut self, raw: DataFrame) {
        info!("Reloading session with {} raw rows", raw.height());
        self.raw = raw;
        self.clean = OnceCell::new();
    }

    /// Apply a filter to the clean dataset.
    pub fn filter(&self, spec: &FilterSpec) -> Result<DataFrame> {
        spec.check_filterable(&self.config().catalog)?;
        filter::apply(self.clean()?.data(), spec)
    }

    /// Filter, then aggregate.
    pub fn aggregate(&self, spec: &FilterSpec, aggregation: &AggregationSpec) -> Result<DataFrame> {
        let filtered = self.filter(spec)?;
        aggregate::aggregate(&filtered, aggregation)
    }

    /// Export filename for a filtered dataset.
    pub fn filter_filename(&self, spec: &FilterSpec) -> String {
        spec.export_filename(&self.config().catalog)
    }

    pub fn chart(&self, request: &ChartRequest) -> Result<ChartData> {
        chart::chart_data(self.clean()?.data(), request, &self.config().catalog)
    }

    pub fn compare(&self, request: &ComparisonRequest) -> Result<ChartData> {
        chart::compare_cities(self.clean()?.data(), request)
    }

    /// Distinct cities in the clean dataset, sorted.
    pub fn city_options(&self) -> Result<Vec<String>> {
        let cities: BTreeSet<&str> = string_values(self.clean()?.data(), CITY_COLUMN)?
            .into_iter()
            .flatten()
            .collect();
        Ok(cities.into_iter().map(str::to_string).collect())
    }

    /// Earliest and latest date in the clean dataset.
    pub fn date_bounds(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let clean = self.clean()?;
        let date_column = self.config().catalog.date_column().unwrap_or_default();
        let dates: Vec<NaiveDate> = date_values(clean.data(), date_column)?
            .into_iter()
            .flatten()
            .collect();
        Ok(dates.iter().min().copied().zip(dates.iter().max().copied()))
    }

    /// Minimum and maximum of a metric in the clean dataset.
    pub fn metric_bounds(&self, metric: Metric) -> Result<Option<(f64, f64)>> {
        let values: Vec<f64> = float_values(self.clean()?.data(), metric.column_name())?
            .into_iter()
            .flatten()
            .collect();
        let min = values.iter().copied().reduce(f64::min);
        let max = values.iter().copied().reduce(f64::max);
        Ok(min.zip(max))
    }
}
