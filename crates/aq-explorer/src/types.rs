use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Null count for one column, taken before any coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullAudit {
    pub column: String,
    pub null_count: usize,
    /// Percentage (0 - 100) of rows that are null.
    pub null_percentage: f64,
}

/// Cells of one column that could not be coerced to the target type.
///
/// Each cell was replaced with null and removed by null elimination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionIssue {
    pub column: String,
    pub target_type: String,
    pub failed_cells: usize,
    /// Up to three offending raw values, for display.
    pub examples: Vec<String>,
}

/// Outcome of filtering one metric column by its Tukey fences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    /// Fences actually used for filtering; `None` when the column had no values.
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Fences clamped to the observed min/max, for display only.
    pub clipped_lower: Option<f64>,
    pub clipped_upper: Option<f64>,
    pub rows_before: usize,
    pub rows_removed: usize,
}

/// Named stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    NullAudit,
    Coercion,
    ColumnPruning,
    OutlierFiltering,
    NullElimination,
}

impl CleaningStage {
    /// All stages in the order the pipeline runs them.
    pub const ORDER: [CleaningStage; 5] = [
        CleaningStage::NullAudit,
        CleaningStage::Coercion,
        CleaningStage::ColumnPruning,
        CleaningStage::OutlierFiltering,
        CleaningStage::NullElimination,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NullAudit => "Null audit",
            Self::Coercion => "Type coercion",
            Self::ColumnPruning => "Column pruning",
            Self::OutlierFiltering => "Outlier filtering",
            Self::NullElimination => "Null elimination",
        }
    }
}

/// Shape of the data before and after one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: CleaningStage,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_in: usize,
    pub columns_out: usize,
}

/// Everything the cleaning pipeline records about a run.
///
/// Used for reproducible reporting only; nothing downstream branches on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningDiagnostics {
    pub rows_before: usize,
    pub rows_after: usize,
    pub null_audit: Vec<NullAudit>,
    pub coercion_issues: Vec<CoercionIssue>,
    pub dropped_columns: Vec<String>,
    pub outliers: Vec<OutlierReport>,
    /// Rows removed by the final null elimination.
    pub null_rows_dropped: usize,
    pub stages: Vec<StageReport>,
}

impl CleaningDiagnostics {
    /// Audit entry for a column, if it was present in the raw data.
    pub fn null_audit_for(&self, column: &str) -> Option<&NullAudit> {
        self.null_audit.iter().find(|a| a.column == column)
    }

    /// Outlier report for a metric column.
    pub fn outliers_for(&self, column: &str) -> Option<&OutlierReport> {
        self.outliers.iter().find(|o| o.column == column)
    }

    /// Total rows removed by outlier filtering across all metrics.
    pub fn outlier_rows_removed(&self) -> usize {
        self.outliers.iter().map(|o| o.rows_removed).sum()
    }

    /// Render the null audit as a `Column | Missing Count | Missing %` table.
    pub fn null_audit_frame(&self) -> Result<DataFrame> {
        let columns: Vec<&str> = self.null_audit.iter().map(|a| a.column.as_str()).collect();
        let counts: Vec<u64> = self.null_audit.iter().map(|a| a.null_count as u64).collect();
        let pct: Vec<f64> = self.null_audit.iter().map(|a| a.null_percentage).collect();

        Ok(DataFrame::new(vec![
            Series::new("Column".into(), columns).into_column(),
            Series::new("Missing Count".into(), counts).into_column(),
            Series::new("Missing %".into(), pct).into_column(),
        ])?)
    }

    /// Render the outlier reports as a table of filtering and display bounds.
    pub fn outlier_frame(&self) -> Result<DataFrame> {
        let columns: Vec<&str> = self.outliers.iter().map(|o| o.column.as_str()).collect();
        let lower: Vec<Option<f64>> = self.outliers.iter().map(|o| o.lower).collect();
        let upper: Vec<Option<f64>> = self.outliers.iter().map(|o| o.upper).collect();
        let clipped_lower: Vec<Option<f64>> =
            self.outliers.iter().map(|o| o.clipped_lower).collect();
        let clipped_upper: Vec<Option<f64>> =
            self.outliers.iter().map(|o| o.clipped_upper).collect();
        let removed: Vec<u64> = self.outliers.iter().map(|o| o.rows_removed as u64).collect();

        Ok(DataFrame::new(vec![
            Series::new("Column".into(), columns).into_column(),
            Series::new("Lower".into(), lower).into_column(),
            Series::new("Upper".into(), upper).into_column(),
            Series::new("Kept From".into(), clipped_lower).into_column(),
            Series::new("Kept To".into(), clipped_upper).into_column(),
            Series::new("Rows Removed".into(), removed).into_column(),
        ])?)
    }
}

/// Name, dtype and non-null count of one column (a dataframe "info" row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub non_null_count: usize,
}

/// Shape and per-column info of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CleaningDiagnostics {
        CleaningDiagnostics {
            rows_before: 4,
            rows_after: 2,
            null_audit: vec![
                NullAudit {
                    column: "AQI".to_string(),
                    null_count: 1,
                    null_percentage: 25.0,
                },
                NullAudit {
                    column: "CO2".to_string(),
                    null_count: 3,
                    null_percentage: 75.0,
                },
            ],
            outliers: vec![OutlierReport {
                column: "AQI".to_string(),
                lower: Some(-10.0),
                upper: Some(110.0),
                clipped_lower: Some(5.0),
                clipped_upper: Some(95.0),
                rows_before: 4,
                rows_removed: 1,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_helpers() {
        let diagnostics = sample();
        assert_eq!(diagnostics.null_audit_for("CO2").unwrap().null_count, 3);
        assert!(diagnostics.null_audit_for("PM10").is_none());
        assert_eq!(diagnostics.outliers_for("AQI").unwrap().rows_removed, 1);
        assert_eq!(diagnostics.outlier_rows_removed(), 1);
    }

    #[test]
    fn test_null_audit_frame() {
        let frame = sample().null_audit_frame().unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(
            crate::utils::column_names(&frame),
            vec!["Column", "Missing Count", "Missing %"]
        );
    }

    #[test]
    fn test_outlier_frame() {
        let frame = sample().outlier_frame().unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.width(), 6);
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(CleaningStage::ORDER[0], CleaningStage::NullAudit);
        assert_eq!(CleaningStage::ORDER[4], CleaningStage::NullElimination);
        assert_eq!(CleaningStage::OutlierFiltering.display_name(), "Outlier filtering");
    }
}
