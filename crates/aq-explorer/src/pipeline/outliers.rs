//! Outlier handling module.
//!
//! Tukey-fence bound computation and row filtering for numeric columns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_IQR_MULTIPLIER;
use crate::error::Result;
use crate::types::OutlierReport;
use crate::utils::{filter_rows, float_values};

/// Tukey fences for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    /// `Q1 - k * IQR`, used for filtering.
    pub lower: f64,
    /// `Q3 + k * IQR`, used for filtering.
    pub upper: f64,
    /// `lower` clamped to the observed minimum. Display only.
    pub clipped_lower: f64,
    /// `upper` clamped to the observed maximum. Display only.
    pub clipped_upper: f64,
}

/// Linear-interpolated quantile of an ascending slice.
///
/// Uses `h = (n - 1) * p` and interpolates between `x[floor(h)]` and the
/// next rank. Returns `None` for an empty slice.
pub fn quantile_linear(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let h = last as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(last);
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Detects and removes outliers using Tukey's rule.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    multiplier: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IQR_MULTIPLIER)
    }
}

impl OutlierFilter {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// Compute Tukey fences over `values`, ignoring NaN.
    ///
    /// Returns `None` when no values remain.
    pub fn compute_bounds(&self, values: &[f64]) -> Option<OutlierBounds> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_linear(&sorted, 0.25)?;
        let q3 = quantile_linear(&sorted, 0.75)?;
        let iqr = q3 - q1;
        let lower = q1 - self.multiplier * iqr;
        let upper = q3 + self.multiplier * iqr;

        let observed_min = sorted[0];
        let observed_max = sorted[sorted.len() - 1];

        Some(OutlierBounds {
            lower,
            upper,
            clipped_lower: lower.max(observed_min),
            clipped_upper: upper.min(observed_max),
        })
    }

    /// Keep rows where `lower <= value <= upper`.
    ///
    /// Null values never satisfy the range and are removed.
    pub fn filter(df: &DataFrame, column: &str, lower: f64, upper: f64) -> Result<DataFrame> {
        let keep: Vec<bool> = float_values(df, column)?
            .into_iter()
            .map(|v| v.is_some_and(|val| lower <= val && val <= upper))
            .collect();
        filter_rows(df, &keep)
    }

    /// Filter one column by its own fences and report what happened.
    pub fn filter_column(&self, df: &DataFrame, column: &str) -> Result<(DataFrame, OutlierReport)> {
        let rows_before = df.height();
        let values: Vec<f64> = float_values(df, column)?.into_iter().flatten().collect();

        let bounds = self.compute_bounds(&values);
        let filtered = match bounds {
            Some(b) => Self::filter(df, column, b.lower, b.upper)?,
            // Undefined fences admit nothing
            None => df.head(Some(0)),
        };

        let report = OutlierReport {
            column: column.to_string(),
            lower: bounds.map(|b| b.lower),
            upper: bounds.map(|b| b.upper),
            clipped_lower: bounds.map(|b| b.clipped_lower),
            clipped_upper: bounds.map(|b| b.clipped_upper),
            rows_before,
            rows_removed: rows_before - filtered.height(),
        };

        match bounds {
            Some(b) => debug!(
                "{}: keeping values between {:.2} and {:.2} ({} rows removed)",
                column, b.clipped_lower, b.clipped_upper, report.rows_removed
            ),
            None => debug!("{}: no values, all {} rows removed", column, rows_before),
        }

        Ok((filtered, report))
    }

    /// Filter each column in turn, each pass seeing only the rows that
    /// survived the previous ones.
    pub fn filter_sequential(
        &self,
        df: DataFrame,
        columns: &[String],
    ) -> Result<(DataFrame, Vec<OutlierReport>)> {
        let mut df = df;
        let mut reports = Vec::with_capacity(columns.len());

        for column in columns {
            let (filtered, report) = self.filter_column(&df, column)?;
            df = filtered;
            reports.push(report);
        }

        Ok((df, reports))
    }
}
