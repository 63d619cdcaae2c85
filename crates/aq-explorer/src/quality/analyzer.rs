use polars::prelude::*;
use tracing::debug;

use crate::error::{ExplorerError, Result};
use crate::schema::ColumnCatalog;
use crate::types::{ColumnInfo, DatasetInfo, NullAudit};

/// Default number of rows shown in a raw preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

pub struct DataQualityAnalyzer;

impl DataQualityAnalyzer {
    /// Count nulls in every column, in dataset order.
    ///
    /// Fails with a schema error naming the first required catalog column
    /// that is absent from `df`.
    pub fn null_audit(df: &DataFrame, catalog: &ColumnCatalog) -> Result<Vec<NullAudit>> {
        Self::check_required_columns(df, catalog)?;

        let total_rows = df.height();
        let audit = df
            .get_columns()
            .iter()
            .map(|col| {
                let null_count = col.null_count();
                let null_percentage = if total_rows == 0 {
                    0.0
                } else {
                    (null_count as f64 / total_rows as f64) * 100.0
                };
                debug!(
                    "  {}: {} nulls ({:.2}%)",
                    col.name(),
                    null_count,
                    null_percentage
                );
                NullAudit {
                    column: col.name().to_string(),
                    null_count,
                    null_percentage,
                }
            })
            .collect();

        Ok(audit)
    }

    /// Ensure every required catalog column is present.
    pub fn check_required_columns(df: &DataFrame, catalog: &ColumnCatalog) -> Result<()> {
        let present: Vec<String> = crate::utils::column_names(df);
        match catalog
            .required_columns()
            .find(|required| !present.iter().any(|p| p == *required))
        {
            Some(missing) => Err(ExplorerError::missing_column(missing)),
            None => Ok(()),
        }
    }

    /// Shape, dtype and non-null count per column.
    pub fn info(df: &DataFrame) -> DatasetInfo {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                dtype: col.dtype().to_string(),
                non_null_count: col.len() - col.null_count(),
            })
            .collect();

        DatasetInfo {
            rows: df.height(),
            columns,
        }
    }

    /// First `n` rows of the dataset.
    pub fn preview(df: &DataFrame, n: usize) -> DataFrame {
        df.head(Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df![
            "Date" => [Some("2023-01-01"), Some("2023-01-02"), None, Some("2023-01-04")],
            "City" => ["Delhi", "Delhi", "Lagos", "Lagos"],
            "CO" => [Some(1.0), Some(2.0), Some(3.0), None],
            "CO2" => [None, Some(400.0), None, None],
            "NO2" => [1.0, 2.0, 3.0, 4.0],
            "SO2" => [1.0, 2.0, 3.0, 4.0],
            "O3" => [1.0, 2.0, 3.0, 4.0],
            "PM2.5" => [1.0, 2.0, 3.0, 4.0],
            "PM10" => [1.0, 2.0, 3.0, 4.0],
            "AQI" => [10i64, 20, 30, 40],
        ]
        .unwrap()
    }

    #[test]
    fn test_null_audit_counts_and_percentages() {
        let audit = DataQualityAnalyzer::null_audit(&raw_frame(), &ColumnCatalog::air_quality())
            .unwrap();

        assert_eq!(audit.len(), 10);
        let co2 = audit.iter().find(|a| a.column == "CO2").unwrap();
        assert_eq!(co2.null_count, 3);
        assert!((co2.null_percentage - 75.0).abs() < 1e-9);

        let date = audit.iter().find(|a| a.column == "Date").unwrap();
        assert_eq!(date.null_count, 1);

        let aqi = audit.iter().find(|a| a.column == "AQI").unwrap();
        assert_eq!(aqi.null_count, 0);
        assert_eq!(aqi.null_percentage, 0.0);
    }

    #[test]
    fn test_null_audit_missing_column_is_schema_error() {
        let df = raw_frame().drop("PM10").unwrap();
        let err =
            DataQualityAnalyzer::null_audit(&df, &ColumnCatalog::air_quality()).unwrap_err();
        assert!(err.is_schema_error());
        assert_eq!(err.column(), Some("PM10"));
    }

    #[test]
    fn test_null_audit_without_droppable_column_is_fine() {
        let df = raw_frame().drop("CO2").unwrap();
        let audit = DataQualityAnalyzer::null_audit(&df, &ColumnCatalog::air_quality()).unwrap();
        assert_eq!(audit.len(), 9);
    }

    #[test]
    fn test_null_audit_empty_frame_has_zero_percentages() {
        let df = raw_frame().head(Some(0));
        let audit = DataQualityAnalyzer::null_audit(&df, &ColumnCatalog::air_quality()).unwrap();
        assert!(audit.iter().all(|a| a.null_percentage == 0.0));
    }

    #[test]
    fn test_info_and_preview() {
        let df = raw_frame();
        let info = DataQualityAnalyzer::info(&df);
        assert_eq!(info.rows, 4);
        let co = info.columns.iter().find(|c| c.name == "CO").unwrap();
        assert_eq!(co.non_null_count, 3);
        assert_eq!(co.dtype, "f64");

        assert_eq!(DataQualityAnalyzer::preview(&df, DEFAULT_PREVIEW_ROWS).height(), 4);
        assert_eq!(DataQualityAnalyzer::preview(&df, 2).height(), 2);
    }
}
