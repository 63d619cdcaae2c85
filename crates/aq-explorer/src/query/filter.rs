//! Multi-predicate row filtering.
//!
//! Every active predicate is evaluated into one boolean mask and the clean
//! dataset is filtered once. Predicates are independent, so evaluation order
//! never changes the result.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{ExplorerError, Result};
use crate::export::{FILTERED_PREFIX, build_filename, city_descriptor, date_range_descriptor};
use crate::schema::{CITY_COLUMN, ColumnCatalog, DATE_COLUMN, Metric};
use crate::utils::{date_values, filter_rows, float_values, is_numeric_dtype, string_values};

/// A constraint on a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Value must be one of `allowed`. An empty set matches nothing.
    SetMembership { allowed: BTreeSet<String> },
    /// `min <= value <= max`. Equality is exact; `min > max` matches nothing.
    NumericRange { min: f64, max: f64 },
    /// `start <= date <= end` at day granularity.
    DateRange { start: NaiveDate, end: NaiveDate },
}

impl Predicate {
    /// Build a set-membership predicate.
    pub fn set_membership<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::SetMembership {
            allowed: values.into_iter().map(Into::into).collect(),
        }
    }

    /// True when no value can ever satisfy this predicate.
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Self::SetMembership { allowed } => allowed.is_empty(),
            Self::NumericRange { min, max } => min.is_nan() || max.is_nan() || min > max,
            Self::DateRange { start, end } => start > end,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::SetMembership { .. } => "set membership",
            Self::NumericRange { .. } => "numeric range",
            Self::DateRange { .. } => "date range",
        }
    }

    /// Check that `dtype` is a column type this predicate can be applied to.
    fn accepts(&self, dtype: &DataType) -> bool {
        match self {
            Self::SetMembership { .. } => dtype == &DataType::String,
            Self::NumericRange { .. } => is_numeric_dtype(dtype),
            Self::DateRange { .. } => dtype == &DataType::Date,
        }
    }
}

/// Active predicates keyed by column name. Absent columns are not filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    predicates: BTreeMap<String, Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the predicate for `column`.
    pub fn with(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.predicates.insert(column.into(), predicate);
        self
    }

    /// Restrict the city column to `cities`.
    pub fn cities<I, S>(self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(CITY_COLUMN, Predicate::set_membership(cities))
    }

    /// Restrict the date column to `start..=end`.
    pub fn date_range(self, start: NaiveDate, end: NaiveDate) -> Self {
        self.with(DATE_COLUMN, Predicate::DateRange { start, end })
    }

    /// Restrict a metric to `min..=max`.
    pub fn range(self, metric: Metric, min: f64, max: f64) -> Self {
        self.with(metric.column_name(), Predicate::NumericRange { min, max })
    }

    /// Predicate for `column`, if one is active.
    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.predicates.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Active predicates in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.predicates.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fail with a schema error if any predicate targets a column the
    /// catalog does not mark filterable.
    pub fn check_filterable(&self, catalog: &ColumnCatalog) -> Result<()> {
        match self.predicates.keys().find(|c| !catalog.is_filterable(c)) {
            Some(column) => Err(ExplorerError::wrong_type(
                column.as_str(),
                "column is not filterable",
            )),
            None => Ok(()),
        }
    }

    /// Filename descriptors for the active set and date predicates, in the
    /// catalog's filter declaration order. Numeric ranges contribute nothing.
    pub fn export_descriptors(&self, catalog: &ColumnCatalog) -> Vec<String> {
        catalog
            .filterable_columns()
            .iter()
            .filter_map(|column| match self.predicates.get(column)? {
                Predicate::SetMembership { allowed } => {
                    Some(city_descriptor(allowed.iter().map(String::as_str)))
                }
                Predicate::DateRange { start, end } => Some(date_range_descriptor(*start, *end)),
                Predicate::NumericRange { .. } => None,
            })
            .collect()
    }

    /// Export filename for the filtered dataset.
    pub fn export_filename(&self, catalog: &ColumnCatalog) -> String {
        build_filename(FILTERED_PREFIX, &self.export_descriptors(catalog))
    }
}

/// Apply every active predicate in `spec` to `df`.
///
/// An empty spec returns the dataset unchanged. A predicate on a missing
/// column, or on a column of the wrong type, is a schema error; an
/// unsatisfiable predicate returns zero rows.
pub fn apply(df: &DataFrame, spec: &FilterSpec) -> Result<DataFrame> {
    if spec.is_empty() {
        return Ok(df.clone());
    }

    for (column, predicate) in spec.iter() {
        let dtype = df
            .column(column)
            .map_err(|_| ExplorerError::missing_column(column))?
            .dtype();
        if !predicate.accepts(dtype) {
            return Err(ExplorerError::wrong_type(
                column,
                format!("{} predicate cannot apply to {}", predicate.kind_name(), dtype),
            ));
        }
    }

    if let Some((column, _)) = spec.iter().find(|(_, p)| p.is_unsatisfiable()) {
        debug!("Predicate on '{}' matches nothing", column);
        return Ok(df.head(Some(0)));
    }

    let mut keep = vec![true; df.height()];
    for (column, predicate) in spec.iter() {
        match predicate {
            Predicate::SetMembership { allowed } => {
                let values = string_values(df, column)?;
                narrow(&mut keep, values, |v| allowed.contains(v));
            }
            Predicate::NumericRange { min, max } => {
                let values = float_values(df, column)?;
                narrow(&mut keep, values, |v| *min <= v && v <= *max);
            }
            Predicate::DateRange { start, end } => {
                let values = date_values(df, column)?;
                narrow(&mut keep, values, |d| *start <= d && d <= *end);
            }
        }
    }

    let filtered = filter_rows(df, &keep)?;
    debug!(
        "Filter with {} predicates kept {} of {} rows",
        spec.len(),
        filtered.height(),
        df.height()
    );
    Ok(filtered)
}

/// AND a per-row test into `keep`. Nulls never match.
fn narrow<T>(keep: &mut [bool], values: Vec<Option<T>>, test: impl Fn(T) -> bool) {
    for (slot, value) in keep.iter_mut().zip(values) {
        *slot = *slot && value.is_some_and(&test);
    }
}
