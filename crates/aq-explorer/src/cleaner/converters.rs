//! Cell-level type coercion used by the cleaning pipeline.
//!
//! A cell that fails to coerce becomes null and is counted; it never aborts
//! the run. Only a column whose dtype cannot be coerced at all is an error.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::warn;

use crate::error::{ExplorerError, Result};
use crate::types::CoercionIssue;
use crate::utils::{date_series, is_numeric_dtype, parse_date};

const MAX_EXAMPLES: usize = 3;

/// Tally of cells that failed to coerce in one column.
#[derive(Debug, Default)]
struct FailureTally {
    count: usize,
    examples: Vec<String>,
}

impl FailureTally {
    fn record(&mut self, raw: &str) {
        self.count += 1;
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(raw.to_string());
        }
    }

    fn into_issue(self, column: &str, target_type: &str) -> Option<CoercionIssue> {
        if self.count == 0 {
            return None;
        }
        warn!(
            "{} cells in '{}' could not be parsed as {} and were nulled",
            self.count, column, target_type
        );
        Some(CoercionIssue {
            column: column.to_string(),
            target_type: target_type.to_string(),
            failed_cells: self.count,
            examples: self.examples,
        })
    }
}

/// Convert a date column to `Date`, keeping only the calendar day.
pub(crate) fn coerce_date_column(
    series: &Series,
    extra_formats: &[String],
) -> Result<(Series, Option<CoercionIssue>)> {
    let name = series.name().to_string();

    match series.dtype() {
        DataType::Date => Ok((series.clone(), None)),
        DataType::Datetime(_, _) | DataType::Null => Ok((series.cast(&DataType::Date)?, None)),
        DataType::String => {
            let mut tally = FailureTally::default();
            let dates: Vec<Option<NaiveDate>> = series
                .str()?
                .into_iter()
                .map(|opt| {
                    opt.and_then(|raw| {
                        let parsed = parse_date(raw, extra_formats);
                        if parsed.is_none() {
                            tally.record(raw);
                        }
                        parsed
                    })
                })
                .collect();

            let converted = date_series(&name, &dates)?;
            Ok((converted, tally.into_issue(&name, "date")))
        }
        other => Err(ExplorerError::wrong_type(
            name,
            format!("cannot interpret {} as a date", other),
        )),
    }
}

/// Convert a metric column to `Float64`. NaN is treated as missing.
pub(crate) fn coerce_metric_column(series: &Series) -> Result<(Series, Option<CoercionIssue>)> {
    let name = series.name().to_string();

    let values: Vec<Option<f64>> = match series.dtype() {
        dtype if is_numeric_dtype(dtype) || dtype == &DataType::Null => {
            let float_series = series.cast(&DataType::Float64)?;
            float_series
                .f64()?
                .into_iter()
                .map(|opt| opt.filter(|v| !v.is_nan()))
                .collect()
        }
        DataType::String => {
            let mut tally = FailureTally::default();
            let parsed: Vec<Option<f64>> = series
                .str()?
                .into_iter()
                .map(|opt| {
                    opt.and_then(|raw| {
                        let trimmed = raw.trim();
                        if trimmed.is_empty() {
                            return None;
                        }
                        match trimmed.parse::<f64>() {
                            Ok(v) if !v.is_nan() => Some(v),
                            _ => {
                                tally.record(raw);
                                None
                            }
                        }
                    })
                })
                .collect();

            return Ok((
                Series::new(name.as_str().into(), parsed),
                tally.into_issue(&name, "float"),
            ));
        }
        other => {
            return Err(ExplorerError::wrong_type(
                name,
                format!("cannot interpret {} as a number", other),
            ));
        }
    };

    Ok((Series::new(name.as_str().into(), values), None))
}

/// Ensure a categorical column holds plain strings.
pub(crate) fn coerce_dimension_column(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::String => Ok(series.clone()),
        DataType::Categorical(_, _) | DataType::Null => Ok(series.cast(&DataType::String)?),
        other => Err(ExplorerError::wrong_type(
            series.name().to_string(),
            format!("expected text values, found {}", other),
        )),
    }
}
