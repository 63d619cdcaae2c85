//! Grouped aggregate views over a (possibly filtered) dataset.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::schema::{CITY_COLUMN, Metric};
use crate::utils::{float_values, string_values};

pub const COUNT_COLUMN: &str = "count";
pub const MEAN_COLUMN: &str = "mean";
pub const STD_COLUMN: &str = "std";
pub const MIN_COLUMN: &str = "min";
pub const MAX_COLUMN: &str = "max";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    MeanByGroup,
    SummaryStats,
}

/// Which metric to aggregate, grouped by which column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by: String,
    pub metric: String,
    pub kind: AggregationKind,
}

impl AggregationSpec {
    /// Aggregate `metric` per city.
    pub fn by_city(metric: Metric, kind: AggregationKind) -> Self {
        Self {
            group_by: CITY_COLUMN.to_string(),
            metric: metric.column_name().to_string(),
            kind,
        }
    }
}

/// Mean of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMean {
    pub group: String,
    pub mean: f64,
}

/// Sample statistics of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    /// Non-null metric values in the group.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample (N-1) standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Metric values per group key, keys ascending. Rows with a null key are
/// skipped; null metric values are dropped but still register the group.
fn collect_groups<'a>(
    df: &'a DataFrame,
    group_col: &str,
    metric_col: &str,
) -> Result<BTreeMap<&'a str, Vec<f64>>> {
    let keys = string_values(df, group_col)?;
    let values = float_values(df, metric_col)?;

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        let Some(key) = key else {
            continue;
        };
        let bucket = groups.entry(key).or_default();
        if let Some(v) = value {
            bucket.push(v);
        }
    }
    Ok(groups)
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Per-group means sorted descending; ties keep ascending key order.
pub fn group_means(df: &DataFrame, group_col: &str, metric_col: &str) -> Result<Vec<GroupMean>> {
    let mut means: Vec<GroupMean> = collect_groups(df, group_col, metric_col)?
        .into_iter()
        .filter_map(|(group, values)| {
            mean_of(&values).map(|mean| GroupMean {
                group: group.to_string(),
                mean,
            })
        })
        .collect();
    means.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    Ok(means)
}

/// Per-group count, mean, std, min and max, sorted by key.
pub fn group_summaries(
    df: &DataFrame,
    group_col: &str,
    metric_col: &str,
) -> Result<Vec<GroupSummary>> {
    let summaries = collect_groups(df, group_col, metric_col)?
        .into_iter()
        .map(|(group, values)| {
            let mean = mean_of(&values);
            GroupSummary {
                group: group.to_string(),
                count: values.len(),
                mean,
                std: mean.and_then(|m| sample_std(&values, m)),
                min: values.iter().copied().reduce(f64::min),
                max: values.iter().copied().reduce(f64::max),
            }
        })
        .collect();
    Ok(summaries)
}

/// Table `[group_col, metric_col]` of per-group means, highest first.
pub fn mean_by_group(df: &DataFrame, group_col: &str, metric_col: &str) -> Result<DataFrame> {
    let means = group_means(df, group_col, metric_col)?;
    let groups: Vec<&str> = means.iter().map(|m| m.group.as_str()).collect();
    let values: Vec<f64> = means.iter().map(|m| m.mean).collect();

    Ok(DataFrame::new(vec![
        Series::new(group_col.into(), groups).into_column(),
        Series::new(metric_col.into(), values).into_column(),
    ])?)
}

/// Table `[group_col, count, mean, std, min, max]`, one row per group.
pub fn summary_stats(df: &DataFrame, group_col: &str, metric_col: &str) -> Result<DataFrame> {
    let summaries = group_summaries(df, group_col, metric_col)?;

    let groups: Vec<&str> = summaries.iter().map(|s| s.group.as_str()).collect();
    let counts: Vec<u64> = summaries.iter().map(|s| s.count as u64).collect();
    let means: Vec<Option<f64>> = summaries.iter().map(|s| s.mean).collect();
    let stds: Vec<Option<f64>> = summaries.iter().map(|s| s.std).collect();
    let mins: Vec<Option<f64>> = summaries.iter().map(|s| s.min).collect();
    let maxs: Vec<Option<f64>> = summaries.iter().map(|s| s.max).collect();

    Ok(DataFrame::new(vec![
        Series::new(group_col.into(), groups).into_column(),
        Series::new(COUNT_COLUMN.into(), counts).into_column(),
        Series::new(MEAN_COLUMN.into(), means).into_column(),
        Series::new(STD_COLUMN.into(), stds).into_column(),
        Series::new(MIN_COLUMN.into(), mins).into_column(),
        Series::new(MAX_COLUMN.into(), maxs).into_column(),
    ])?)
}

/// Run the aggregation described by `spec`.
pub fn aggregate(df: &DataFrame, spec: &AggregationSpec) -> Result<DataFrame> {
    match spec.kind {
        AggregationKind::MeanByGroup => mean_by_group(df, &spec.group_by, &spec.metric),
        AggregationKind::SummaryStats => summary_stats(df, &spec.group_by, &spec.metric),
    }
}
