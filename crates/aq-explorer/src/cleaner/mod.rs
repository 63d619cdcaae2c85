//! Row and column cleaning operations.
//!
//! This module provides the mutating stages of the cleaning pipeline:
//! - Coercing dates, metrics and dimensions to their target types
//! - Dropping configured columns
//! - Removing rows that still contain nulls

mod converters;

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::CleaningConfig;
use crate::error::{ResultExt, Result};
use crate::schema::ColumnRole;
use crate::types::CoercionIssue;

use converters::{coerce_date_column, coerce_dimension_column, coerce_metric_column};

/// Data cleaner for the type, column and null stages of the pipeline.
pub struct DataCleaner;

impl DataCleaner {
    /// Coerce every catalogued column to its target type.
    ///
    /// Columns absent from `df` or not in the catalog are left untouched.
    pub fn coerce_types(
        df: DataFrame,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, Vec<CoercionIssue>)> {
        let mut df = df;
        let mut issues = Vec::new();

        for spec in config.catalog.columns() {
            let Ok(column) = df.column(&spec.name) else {
                continue;
            };
            let series = column.as_materialized_series().clone();

            let converted = match spec.role {
                ColumnRole::Date => {
                    let (converted, issue) =
                        coerce_date_column(&series, &config.extra_date_formats)?;
                    issues.extend(issue);
                    converted
                }
                ColumnRole::Metric => {
                    let (converted, issue) = coerce_metric_column(&series)?;
                    issues.extend(issue);
                    converted
                }
                ColumnRole::Dimension => coerce_dimension_column(&series)?,
                ColumnRole::Droppable => continue,
            };

            debug!("Coerced '{}' to {}", spec.name, converted.dtype());
            df.replace(&spec.name, converted)
                .context(format!("Replacing column '{}'", spec.name))?;
        }

        Ok((df, issues))
    }

    /// Drop the configured columns that are present in `df`.
    ///
    /// Returns the frame and the names actually dropped.
    pub fn prune_columns(df: DataFrame, drop_list: &[String]) -> (DataFrame, Vec<String>) {
        let present = crate::utils::column_names(&df);
        let dropped: Vec<String> = drop_list
            .iter()
            .filter(|c| present.contains(*c))
            .cloned()
            .collect();

        if dropped.is_empty() {
            return (df, dropped);
        }

        let cols_ref: Vec<PlSmallStr> = dropped.iter().map(|s| s.as_str().into()).collect();
        let df = df.drop_many(cols_ref);
        info!("Dropped columns: {:?}", dropped);
        (df, dropped)
    }

    /// Remove every row with a null in any column.
    ///
    /// Returns the frame and the number of rows removed.
    pub fn drop_null_rows(df: DataFrame) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let mut keep = vec![true; before];

        for col in df.get_columns() {
            if col.null_count() == 0 {
                continue;
            }
            let not_null_mask = col.is_not_null();
            for (slot, not_null) in keep.iter_mut().zip(not_null_mask.into_iter()) {
                *slot &= not_null.unwrap_or(false);
            }
        }

        let df = crate::utils::filter_rows(&df, &keep)?;
        let removed = before - df.height();
        if removed > 0 {
            debug!("Removed {} rows containing nulls", removed);
        }
        Ok((df, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_names;

    fn raw_frame() -> DataFrame {
        df![
            "Date" => [Some("2023-01-01"), Some("bad"), Some("2023-01-03")],
            "City" => ["Delhi", "Lagos", "Delhi"],
            "CO" => [Some(1.0), None, Some(3.0)],
            "CO2" => [None, Some(400.0), None],
            "NO2" => [1.0, 2.0, 3.0],
            "SO2" => [1.0, 2.0, 3.0],
            "O3" => [1.0, 2.0, 3.0],
            "PM2.5" => [1.0, 2.0, 3.0],
            "PM10" => [1.0, 2.0, 3.0],
            "AQI" => [10i64, 20, 30],
        ]
        .unwrap()
    }

    #[test]
    fn test_coerce_types_converts_dates_and_metrics() {
        let config = CleaningConfig::default();
        let (df, issues) = DataCleaner::coerce_types(raw_frame(), &config).unwrap();

        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("AQI").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("City").unwrap().dtype(), &DataType::String);
        // Droppable columns are not touched
        assert_eq!(df.column("CO2").unwrap().null_count(), 2);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, "Date");
        assert_eq!(issues[0].failed_cells, 1);
    }

    #[test]
    fn test_prune_columns_drops_configured_only() {
        let (df, dropped) = DataCleaner::prune_columns(raw_frame(), &["CO2".to_string()]);
        assert_eq!(dropped, vec!["CO2".to_string()]);
        assert!(!column_names(&df).contains(&"CO2".to_string()));
        assert_eq!(df.width(), 9);
    }

    #[test]
    fn test_prune_columns_missing_name_is_noop() {
        let (df, _) = DataCleaner::prune_columns(raw_frame(), &["CO2".to_string()]);
        let (df, dropped) = DataCleaner::prune_columns(df, &["CO2".to_string()]);
        assert!(dropped.is_empty());
        assert_eq!(df.width(), 9);
    }

    #[test]
    fn test_drop_null_rows() {
        let (df, _) = DataCleaner::prune_columns(raw_frame(), &["CO2".to_string()]);
        let (df, removed) = DataCleaner::drop_null_rows(df).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(df.height(), 2);
        assert!(df.get_columns().iter().all(|c| c.null_count() == 0));
    }

    #[test]
    fn test_drop_null_rows_empty_frame() {
        let df = raw_frame().head(Some(0));
        let (df, removed) = DataCleaner::drop_null_rows(df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(df.height(), 0);
    }
}
