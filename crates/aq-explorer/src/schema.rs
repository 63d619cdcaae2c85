//! Column catalog for the air-quality dataset.
//!
//! Describes which columns a raw dataset must carry, which of them are
//! metrics or dimensions, and in which order filters are declared.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExplorerError;

/// Name of the measurement date column.
pub const DATE_COLUMN: &str = "Date";

/// Name of the city column.
pub const CITY_COLUMN: &str = "City";

/// Name of the carbon dioxide column, present only in raw data.
pub const CO2_COLUMN: &str = "CO2";

/// Numeric pollutant measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "AQI")]
    Aqi,
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "O3")]
    O3,
}

impl Metric {
    /// Metrics in the order they are offered for selection.
    pub const ALL: [Metric; 7] = [
        Metric::Aqi,
        Metric::Pm25,
        Metric::Pm10,
        Metric::Co,
        Metric::No2,
        Metric::So2,
        Metric::O3,
    ];

    /// Column name of the metric in the dataset.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Aqi => "AQI",
            Self::Pm25 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::Co => "CO",
            Self::No2 => "NO2",
            Self::So2 => "SO2",
            Self::O3 => "O3",
        }
    }

    /// Look a metric up by its column name.
    pub fn from_column(name: &str) -> Option<Metric> {
        Self::ALL.into_iter().find(|m| m.column_name() == name)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Metric {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.column_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ExplorerError::Parse {
                column: "metric".to_string(),
                value: s.to_string(),
            })
    }
}

/// Role a column plays in cleaning and querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Calendar date of the measurement.
    Date,
    /// Categorical grouping column (e.g. city).
    Dimension,
    /// Numeric measurement.
    Metric,
    /// Present in raw data only; removed during cleaning.
    Droppable,
}

/// Static description of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
    pub filterable: bool,
}

impl ColumnSpec {
    fn new(name: &str, role: ColumnRole, filterable: bool) -> Self {
        Self {
            name: name.to_string(),
            role,
            filterable,
        }
    }
}

/// Catalog of the columns a dataset is expected to carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCatalog {
    columns: Vec<ColumnSpec>,
    /// Filterable columns in the order filter options are declared.
    filter_order: Vec<String>,
}

impl Default for ColumnCatalog {
    fn default() -> Self {
        Self::air_quality()
    }
}

impl ColumnCatalog {
    /// Catalog of the global air-quality dataset.
    pub fn air_quality() -> Self {
        let mut columns = vec![
            ColumnSpec::new(DATE_COLUMN, ColumnRole::Date, true),
            ColumnSpec::new(CITY_COLUMN, ColumnRole::Dimension, true),
        ];
        columns.extend(
            Metric::ALL
                .iter()
                .map(|m| ColumnSpec::new(m.column_name(), ColumnRole::Metric, true)),
        );
        columns.push(ColumnSpec::new(CO2_COLUMN, ColumnRole::Droppable, false));

        let filter_order = [
            CITY_COLUMN,
            DATE_COLUMN,
            Metric::Aqi.column_name(),
            Metric::Pm25.column_name(),
            Metric::Co.column_name(),
            Metric::No2.column_name(),
            Metric::So2.column_name(),
            Metric::O3.column_name(),
            Metric::Pm10.column_name(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            columns,
            filter_order,
        }
    }

    /// All columns in the catalog.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Look up the role of a column.
    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.role)
    }

    /// Columns that must be present in a raw dataset.
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.role != ColumnRole::Droppable)
            .map(|c| c.name.as_str())
    }

    /// The date column name.
    pub fn date_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.role == ColumnRole::Date)
            .map(|c| c.name.as_str())
    }

    /// Filterable columns in declaration order.
    pub fn filterable_columns(&self) -> &[String] {
        &self.filter_order
    }

    /// Whether a column may carry a filter predicate.
    pub fn is_filterable(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name && c.filterable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_round_trips_column_name() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_column(metric.column_name()), Some(metric));
        }
        assert_eq!(Metric::from_column("CO2"), None);
    }

    #[test]
    fn test_metric_from_str_is_case_insensitive() {
        assert_eq!("pm2.5".parse::<Metric>().unwrap(), Metric::Pm25);
        assert_eq!(" aqi ".parse::<Metric>().unwrap(), Metric::Aqi);
        assert!("ozone".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_serde_uses_column_names() {
        let json = serde_json::to_string(&Metric::Pm25).unwrap();
        assert_eq!(json, "\"PM2.5\"");
        let parsed: Metric = serde_json::from_str("\"NO2\"").unwrap();
        assert_eq!(parsed, Metric::No2);
    }

    #[test]
    fn test_required_columns_exclude_co2() {
        let catalog = ColumnCatalog::air_quality();
        let required: Vec<&str> = catalog.required_columns().collect();
        assert_eq!(required.len(), 9);
        assert!(!required.contains(&CO2_COLUMN));
        assert!(required.contains(&DATE_COLUMN));
        assert!(required.contains(&CITY_COLUMN));
    }

    #[test]
    fn test_filter_order_matches_form_declaration() {
        let catalog = ColumnCatalog::air_quality();
        let order = catalog.filterable_columns();
        assert_eq!(order[0], CITY_COLUMN);
        assert_eq!(order[1], DATE_COLUMN);
        assert_eq!(order.last().map(String::as_str), Some("PM10"));
        assert!(!catalog.is_filterable(CO2_COLUMN));
    }

    #[test]
    fn test_roles() {
        let catalog = ColumnCatalog::air_quality();
        assert_eq!(catalog.role_of("AQI"), Some(ColumnRole::Metric));
        assert_eq!(catalog.role_of(CITY_COLUMN), Some(ColumnRole::Dimension));
        assert_eq!(catalog.role_of(CO2_COLUMN), Some(ColumnRole::Droppable));
        assert_eq!(catalog.role_of("Humidity"), None);
        assert_eq!(catalog.date_column(), Some(DATE_COLUMN));
    }
}
