//! Shared helpers for moving values between Polars columns and Rust types.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::{ExplorerError, Result};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Date-only layouts tried before any datetime layout. Slash dates without a
/// leading year are read month first.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y", "%m-%d-%Y"];

/// Naive datetime layouts; the time-of-day part is discarded.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Parse a raw date cell into a calendar date.
///
/// Offsets and time-of-day are dropped; the date is the one written in the
/// text, not the UTC date.
pub fn parse_date(raw: &str, extra_formats: &[String]) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    extra_formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
    })
}

/// Parse a user-supplied date strictly, returning a parse error on failure.
pub fn parse_date_strict(column: &str, raw: &str) -> Result<NaiveDate> {
    parse_date(raw, &[]).ok_or_else(|| ExplorerError::Parse {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

/// Build a `Date` series from optional calendar dates.
pub fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> Result<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?)
}

/// Read a `Date` column into calendar dates.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let column = df
        .column(name)
        .map_err(|_| ExplorerError::missing_column(name))?;
    if column.dtype() != &DataType::Date {
        return Err(ExplorerError::wrong_type(
            name,
            format!("expected Date, found {}", column.dtype()),
        ));
    }

    let physical = column.cast(&DataType::Int32)?;
    Ok(physical
        .i32()?
        .into_iter()
        .map(|opt| opt.and_then(days_to_date))
        .collect())
}

/// Read a numeric column as `f64`, treating NaN as missing.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ExplorerError::missing_column(name))?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(ExplorerError::wrong_type(
            name,
            format!("expected a numeric column, found {}", column.dtype()),
        ));
    }

    let float_column = column.cast(&DataType::Float64)?;
    Ok(float_column
        .f64()?
        .into_iter()
        .map(|opt| opt.filter(|v| !v.is_nan()))
        .collect())
}

/// Borrow a string column's values.
pub fn string_values<'a>(df: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
    let column = df
        .column(name)
        .map_err(|_| ExplorerError::missing_column(name))?;
    if column.dtype() != &DataType::String {
        return Err(ExplorerError::wrong_type(
            name,
            format!("expected a string column, found {}", column.dtype()),
        ));
    }

    Ok(column.str()?.into_iter().collect())
}

/// Owned column names of a frame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Keep the rows whose mask entry is `true`.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    Ok(df.filter(&mask)?)
}
