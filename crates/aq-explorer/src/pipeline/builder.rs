//! Cleaning pipeline and its builder.
//!
//! The pipeline runs five stages in a fixed order and records what each one
//! did. It never mutates its input; a fatal error leaves nothing behind.

use polars::prelude::*;
use std::time::Instant;
use tracing::{error, info};

use crate::cleaner::DataCleaner;
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::pipeline::outliers::OutlierFilter;
use crate::quality::DataQualityAnalyzer;
use crate::schema::ColumnRole;
use crate::types::{CleaningDiagnostics, CleaningStage, StageReport};

/// Clean a raw dataset with the default configuration.
pub fn clean(raw: &DataFrame) -> Result<(DataFrame, CleaningDiagnostics)> {
    CleaningPipeline::new(CleaningConfig::default()).run(raw)
}

/// Deterministic raw-to-clean transformation.
///
/// Use [`CleaningPipeline::builder()`] to supply a custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use aq_explorer::{CleaningConfig, CleaningPipeline};
///
/// let (clean, diagnostics) = CleaningPipeline::builder()
///     .config(CleaningConfig::builder().iqr_multiplier(3.0).build()?)
///     .build()?
///     .run(&raw)?;
/// ```
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    config: CleaningConfig,
    outliers: OutlierFilter,
}

static_assertions::assert_impl_all!(CleaningPipeline: Send, Sync);

impl Default for CleaningPipeline {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}

impl CleaningPipeline {
    /// Create a pipeline from an already validated configuration.
    pub fn new(config: CleaningConfig) -> Self {
        let outliers = OutlierFilter::new(config.iqr_multiplier);
        Self { config, outliers }
    }

    /// Create a new pipeline builder.
    pub fn builder() -> CleaningPipelineBuilder {
        CleaningPipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run every stage over `raw` and return the clean dataset.
    pub fn run(&self, raw: &DataFrame) -> Result<(DataFrame, CleaningDiagnostics)> {
        self.run_internal(raw).inspect_err(|e| error!("Cleaning failed: {}", e))
    }

    fn run_internal(&self, raw: &DataFrame) -> Result<(DataFrame, CleaningDiagnostics)> {
        let start_time = Instant::now();
        info!(
            "Starting cleaning pipeline on {} rows x {} columns",
            raw.height(),
            raw.width()
        );

        let mut diagnostics = CleaningDiagnostics {
            rows_before: raw.height(),
            ..Default::default()
        };
        let mut tracker = StageTracker::default();

        // Stage 1: null audit
        tracker.begin(raw);
        diagnostics.null_audit = DataQualityAnalyzer::null_audit(raw, &self.config.catalog)?;
        tracker.finish(CleaningStage::NullAudit, raw);
        info!("Step 1: Audited nulls in {} columns", diagnostics.null_audit.len());

        // Stage 2: type coercion
        tracker.begin(raw);
        let (df, issues) = DataCleaner::coerce_types(raw.clone(), &self.config)?;
        tracker.finish(CleaningStage::Coercion, &df);
        info!(
            "Step 2: Coerced column types ({} cells nulled)",
            issues.iter().map(|i| i.failed_cells).sum::<usize>()
        );
        diagnostics.coercion_issues = issues;

        // Stage 3: column pruning
        tracker.begin(&df);
        let (df, dropped) = DataCleaner::prune_columns(df, &self.config.drop_columns);
        tracker.finish(CleaningStage::ColumnPruning, &df);
        info!("Step 3: Pruned {} columns", dropped.len());
        diagnostics.dropped_columns = dropped;

        // Stage 4: outlier filtering, one metric at a time in dataset order
        tracker.begin(&df);
        let metrics = self.metric_order(&df);
        let (df, reports) = self.outliers.filter_sequential(df, &metrics)?;
        tracker.finish(CleaningStage::OutlierFiltering, &df);
        info!(
            "Step 4: Filtered outliers across {} metrics ({} rows removed)",
            reports.len(),
            reports.iter().map(|r| r.rows_removed).sum::<usize>()
        );
        diagnostics.outliers = reports;

        // Stage 5: null elimination
        tracker.begin(&df);
        let (df, removed) = DataCleaner::drop_null_rows(df)?;
        tracker.finish(CleaningStage::NullElimination, &df);
        info!("Step 5: Removed {} rows with remaining nulls", removed);
        diagnostics.null_rows_dropped = removed;

        diagnostics.rows_after = df.height();
        diagnostics.stages = tracker.into_reports();

        info!(
            "Cleaning completed in {:.2?}: {} -> {} rows",
            start_time.elapsed(),
            diagnostics.rows_before,
            diagnostics.rows_after
        );

        Ok((df, diagnostics))
    }

    /// Metric columns present in `df`, in the order they appear there.
    fn metric_order(&self, df: &DataFrame) -> Vec<String> {
        crate::utils::column_names(df)
            .into_iter()
            .filter(|name| self.config.catalog.role_of(name) == Some(ColumnRole::Metric))
            .collect()
    }
}

#[derive(Debug, Default)]
struct StageTracker {
    rows_in: usize,
    columns_in: usize,
    reports: Vec<StageReport>,
}

impl StageTracker {
    fn begin(&mut self, df: &DataFrame) {
        self.rows_in = df.height();
        self.columns_in = df.width();
    }

    fn finish(&mut self, stage: CleaningStage, df: &DataFrame) {
        self.reports.push(StageReport {
            stage,
            rows_in: self.rows_in,
            rows_out: df.height(),
            columns_in: self.columns_in,
            columns_out: df.width(),
        });
    }

    fn into_reports(self) -> Vec<StageReport> {
        self.reports
    }
}

/// Builder for constructing a [`CleaningPipeline`].
#[derive(Debug, Default)]
pub struct CleaningPipelineBuilder {
    config: Option<CleaningConfig>,
}

impl CleaningPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline, validating the configuration.
    pub fn build(self) -> Result<CleaningPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(CleaningPipeline::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_names;
    use pretty_assertions::assert_eq;

    fn delhi_frame(aqi: &[i64], co2: &[Option<f64>]) -> DataFrame {
        let n = aqi.len();
        let dates: Vec<String> = (1..=n).map(|d| format!("2023-01-{:02}", d)).collect();
        df![
            "Date" => dates,
            "City" => vec!["Delhi"; n],
            "CO" => vec![1.0; n],
            "CO2" => co2.to_vec(),
            "NO2" => vec![2.0; n],
            "SO2" => vec![3.0; n],
            "O3" => vec![4.0; n],
            "PM2.5" => vec![80.0; n],
            "PM10" => vec![120.0; n],
            "AQI" => aqi.to_vec(),
        ]
        .unwrap()
    }

    #[test]
    fn test_two_row_scenario_drops_co2() {
        let raw = delhi_frame(&[300, 50], &[None, Some(400.0)]);
        let (clean, diagnostics) = clean(&raw).unwrap();

        assert!(!column_names(&clean).contains(&"CO2".to_string()));
        assert_eq!(diagnostics.dropped_columns, vec!["CO2".to_string()]);
        // Fences over two values are [-75, 425]; both survive.
        assert_eq!(clean.height(), 2);
        assert_eq!(diagnostics.null_audit_for("CO2").unwrap().null_count, 1);
    }

    #[test]
    fn test_outlier_row_removed_when_fences_exclude_it() {
        let raw = delhi_frame(
            &[50, 52, 48, 51, 300],
            &[None, Some(400.0), None, None, None],
        );
        let (clean, diagnostics) = clean(&raw).unwrap();

        assert_eq!(clean.height(), 4);
        let aqi = diagnostics.outliers_for("AQI").unwrap();
        assert_eq!(aqi.rows_removed, 1);
        assert_eq!(aqi.lower, Some(47.0));
        assert_eq!(aqi.upper, Some(55.0));
        assert_eq!(diagnostics.rows_before, 5);
        assert_eq!(diagnostics.rows_after, 4);
    }

    #[test]
    fn test_clean_output_schema() {
        let raw = delhi_frame(&[50, 52, 48, 51], &[None; 4]);
        let (clean, _) = clean(&raw).unwrap();

        assert_eq!(clean.column("Date").unwrap().dtype(), &DataType::Date);
        assert_eq!(clean.column("AQI").unwrap().dtype(), &DataType::Float64);
        assert!(clean.get_columns().iter().all(|c| c.null_count() == 0));
    }

    #[test]
    fn test_recleaning_reaches_fixed_point() {
        let raw = delhi_frame(
            &[50, 52, 48, 51, 300],
            &[None, Some(400.0), None, None, None],
        );
        let (once, _) = clean(&raw).unwrap();
        let (twice, diagnostics) = clean(&once).unwrap();

        assert!(once.equals_missing(&twice));
        assert_eq!(diagnostics.outlier_rows_removed(), 0);
        assert!(diagnostics.dropped_columns.is_empty());
    }

    #[test]
    fn test_unparseable_dates_are_counted_and_removed() {
        let mut raw = delhi_frame(&[50, 52, 48, 51], &[None; 4]);
        let dates = Series::new("Date".into(), &["2023-01-01", "soon", "2023-01-03", "2023-01-04"]);
        raw.replace("Date", dates).unwrap();

        let (clean, diagnostics) = clean(&raw).unwrap();
        assert_eq!(clean.height(), 3);
        assert_eq!(diagnostics.coercion_issues[0].column, "Date");
        assert_eq!(diagnostics.null_rows_dropped, 1);
    }

    #[test]
    fn test_stage_reports_in_order() {
        let raw = delhi_frame(&[50, 52, 48, 51, 300], &[None; 5]);
        let (_, diagnostics) = clean(&raw).unwrap();

        let stages: Vec<CleaningStage> = diagnostics.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, CleaningStage::ORDER.to_vec());

        let pruning = &diagnostics.stages[2];
        assert_eq!(pruning.columns_in, 10);
        assert_eq!(pruning.columns_out, 9);

        let outliers = &diagnostics.stages[3];
        assert_eq!(outliers.rows_in, 5);
        assert_eq!(outliers.rows_out, 4);
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let raw = delhi_frame(&[50], &[None]).drop("PM10").unwrap();
        let err = clean(&raw).unwrap_err();
        assert!(err.is_schema_error());
        assert_eq!(err.column(), Some("PM10"));
    }

    #[test]
    fn test_empty_dataset_cleans_to_empty() {
        let raw = delhi_frame(&[], &[]);
        let (clean, diagnostics) = clean(&raw).unwrap();
        assert_eq!(clean.height(), 0);
        assert_eq!(diagnostics.null_audit[0].null_percentage, 0.0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = CleaningConfig {
            iqr_multiplier: -1.0,
            ..Default::default()
        };
        let err = CleaningPipeline::builder().config(config).build().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_custom_multiplier_keeps_more_rows() {
        let raw = delhi_frame(&[50, 52, 48, 51, 60], &[None; 5]);
        let (strict, _) = clean(&raw).unwrap();

        let config = CleaningConfig::builder().iqr_multiplier(5.0).build().unwrap();
        let (lenient, _) = CleaningPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&raw)
            .unwrap();

        assert_eq!(strict.height(), 4);
        assert_eq!(lenient.height(), 5);
    }
}
