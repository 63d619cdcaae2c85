//! Chart-data preparation and city comparison.
//!
//! Turns a chart selection into the table a charting collaborator plots,
//! together with axis hints and the export filename.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{ExplorerError, Result};
use crate::export::{
    CHART_PREFIX, COMPARISON_PREFIX, build_filename, city_descriptor, date_range_descriptor,
    sanitize_descriptor,
};
use crate::query::{FilterSpec, aggregate, filter};
use crate::schema::{CITY_COLUMN, ColumnCatalog, DATE_COLUMN, Metric};

/// Minimum number of cities a comparison needs.
pub const MIN_COMPARISON_CITIES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Boxplot,
    Scatter,
    SummaryTable,
}

impl ChartKind {
    /// Kinds offered on the comparison dashboard.
    pub const COMPARISON: [ChartKind; 3] =
        [ChartKind::Bar, ChartKind::Boxplot, ChartKind::SummaryTable];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Line => "Line Chart",
            Self::Bar => "Bar Chart",
            Self::Boxplot => "Boxplot",
            Self::Scatter => "Scatter Plot",
            Self::SummaryTable => "Summary Table",
        }
    }

    /// Filename descriptor, e.g. `Line_Chart`.
    pub fn descriptor(&self) -> String {
        sanitize_descriptor(self.display_name())
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ChartKind {
    type Err = ExplorerError;

    /// Accepts the display name or a short id (`line`, `bar`, `box`,
    /// `scatter`, `summary`), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let kind = match wanted.as_str() {
            "line" | "line chart" => Self::Line,
            "bar" | "bar chart" => Self::Bar,
            "box" | "boxplot" | "box plot" => Self::Boxplot,
            "scatter" | "scatter plot" => Self::Scatter,
            "summary" | "summary table" => Self::SummaryTable,
            _ => {
                return Err(ExplorerError::Parse {
                    column: "chart kind".to_string(),
                    value: s.to_string(),
                });
            }
        };
        Ok(kind)
    }
}

/// A visualization request over the clean dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub kind: ChartKind,
    /// Plotted metric; the x axis for scatter plots.
    pub metric: Metric,
    /// Y axis metric, required for scatter plots only.
    #[serde(default)]
    pub y_metric: Option<Metric>,
    #[serde(default)]
    pub filter: FilterSpec,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, metric: Metric) -> Self {
        Self {
            kind,
            metric,
            y_metric: None,
            filter: FilterSpec::default(),
        }
    }

    /// Scatter plot of `y` against `x`.
    pub fn scatter(x: Metric, y: Metric) -> Self {
        Self {
            y_metric: Some(y),
            ..Self::new(ChartKind::Scatter, x)
        }
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }
}

/// Table to plot plus how to plot it.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub kind: ChartKind,
    pub table: DataFrame,
    pub x: String,
    pub y: String,
    /// Column to color series by, if any.
    pub color: Option<String>,
    pub title: String,
    /// Rows written on export. The filtered dataset for chart data, the
    /// chart table itself for a comparison.
    pub export: DataFrame,
    /// Export filename for `export`.
    pub filename: String,
}

/// Derive the chart table for `request` from the clean dataset.
pub fn chart_data(
    clean: &DataFrame,
    request: &ChartRequest,
    catalog: &ColumnCatalog,
) -> Result<ChartData> {
    request.filter.check_filterable(catalog)?;
    let filtered = filter::apply(clean, &request.filter)?;
    let by_city = request.filter.get(CITY_COLUMN).is_some();

    let mut descriptors = request.filter.export_descriptors(catalog);
    descriptors.push(request.kind.descriptor());
    let filename = build_filename(CHART_PREFIX, &descriptors);

    let mut data =
        shape(&filtered, request.kind, request.metric, request.y_metric, by_city, filename)?;
    data.export = filtered;
    info!(
        "Prepared {} data for {}: {} rows",
        data.kind,
        request.metric,
        data.table.height()
    );
    Ok(data)
}

/// A city comparison: at least two cities, one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub cities: BTreeSet<String>,
    #[serde(default)]
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub metric: Metric,
    pub kind: ChartKind,
}

impl ComparisonRequest {
    pub fn new<I, S>(cities: I, metric: Metric, kind: ChartKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cities: cities.into_iter().map(Into::into).collect(),
            date_range: None,
            metric,
            kind,
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.cities.len() < MIN_COMPARISON_CITIES {
            return Err(ExplorerError::InvalidQuery(format!(
                "select at least {} cities to compare (got {})",
                MIN_COMPARISON_CITIES,
                self.cities.len()
            )));
        }
        if !ChartKind::COMPARISON.contains(&self.kind) {
            return Err(ExplorerError::InvalidQuery(format!(
                "{} is not available for city comparison",
                self.kind
            )));
        }
        Ok(())
    }

    fn filter_spec(&self) -> FilterSpec {
        let spec = FilterSpec::new().cities(self.cities.iter().cloned());
        match self.date_range {
            Some((start, end)) => spec.date_range(start, end),
            None => spec,
        }
    }

    /// Export filename: cities, date range, chart kind, metric.
    pub fn filename(&self) -> String {
        let mut descriptors = vec![city_descriptor(self.cities.iter().map(String::as_str))];
        if let Some((start, end)) = self.date_range {
            descriptors.push(date_range_descriptor(start, end));
        }
        descriptors.push(self.kind.descriptor());
        descriptors.push(self.metric.column_name().to_string());
        build_filename(COMPARISON_PREFIX, &descriptors)
    }
}

/// Run a city comparison over the clean dataset.
pub fn compare_cities(clean: &DataFrame, request: &ComparisonRequest) -> Result<ChartData> {
    request.validate()?;
    let filtered = filter::apply(clean, &request.filter_spec())?;
    let data = shape(&filtered, request.kind, request.metric, None, true, request.filename())?;
    info!(
        "Compared {} cities on {}: {} rows",
        request.cities.len(),
        request.metric,
        data.table.height()
    );
    Ok(data)
}

fn shape(
    filtered: &DataFrame,
    kind: ChartKind,
    metric: Metric,
    y_metric: Option<Metric>,
    by_city: bool,
    filename: String,
) -> Result<ChartData> {
    let m = metric.column_name();
    let city_color = by_city.then(|| CITY_COLUMN.to_string());

    let (table, x, y, color, title) = match kind {
        ChartKind::Line => (
            filtered.select([DATE_COLUMN, CITY_COLUMN, m])?,
            DATE_COLUMN.to_string(),
            m.to_string(),
            city_color,
            format!("{} Trend Over Time", m),
        ),
        ChartKind::Bar => (
            aggregate::mean_by_group(filtered, CITY_COLUMN, m)?,
            CITY_COLUMN.to_string(),
            m.to_string(),
            None,
            format!("Average {} by City", m),
        ),
        ChartKind::Boxplot => (
            filtered.select([CITY_COLUMN, DATE_COLUMN, m])?,
            CITY_COLUMN.to_string(),
            m.to_string(),
            city_color,
            format!("{} Distribution by City", m),
        ),
        ChartKind::Scatter => {
            let y_metric = y_metric.ok_or_else(|| {
                ExplorerError::InvalidQuery("scatter plot needs a y-axis metric".to_string())
            })?;
            let y_name = y_metric.column_name();
            let mut columns = vec![CITY_COLUMN, m];
            if y_name != m {
                columns.push(y_name);
            }
            (
                filtered.select(columns)?,
                m.to_string(),
                y_name.to_string(),
                city_color,
                format!("{} vs {}", y_name, m),
            )
        }
        ChartKind::SummaryTable => (
            aggregate::summary_stats(filtered, CITY_COLUMN, m)?,
            CITY_COLUMN.to_string(),
            aggregate::MEAN_COLUMN.to_string(),
            None,
            format!("{} Summary by City", m),
        ),
    };

    Ok(ChartData {
        kind,
        export: table.clone(),
        table,
        x,
        y,
        color,
        title,
        filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use crate::utils::{column_names, date_series};
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, day).unwrap()
    }

    fn clean_frame() -> DataFrame {
        let dates = date_series("Date", &[Some(d(1)), Some(d(2)), Some(d(1)), Some(d(2)), Some(d(3))])
            .unwrap();
        let mut df = df![
            "City" => ["Delhi", "Delhi", "Lagos", "Lagos", "Paris"],
            "AQI" => [100.0, 200.0, 40.0, 60.0, 20.0],
            "PM2.5" => [50.0, 70.0, 10.0, 12.0, 4.0],
        ]
        .unwrap();
        df.with_column(dates).unwrap();
        df
    }

    #[test]
    fn test_chart_kind_parsing() {
        assert_eq!("Line Chart".parse::<ChartKind>().unwrap(), ChartKind::Line);
        assert_eq!("summary_table".parse::<ChartKind>().unwrap(), ChartKind::SummaryTable);
        assert_eq!("box".parse::<ChartKind>().unwrap(), ChartKind::Boxplot);
        assert!("pie".parse::<ChartKind>().is_err());
        assert_eq!(ChartKind::Scatter.descriptor(), "Scatter_Plot");
    }

    #[test]
    fn test_line_chart_colors_by_city_only_when_filtered() {
        let catalog = ColumnCatalog::air_quality();
        let plain = chart_data(&clean_frame(), &ChartRequest::new(ChartKind::Line, Metric::Aqi), &catalog)
            .unwrap();
        assert_eq!(plain.color, None);
        assert_eq!(plain.x, "Date");
        assert_eq!(column_names(&plain.table), vec!["Date", "City", "AQI"]);
        assert_eq!(plain.filename, "chart_data_Line_Chart.csv");

        let request = ChartRequest::new(ChartKind::Line, Metric::Aqi)
            .with_filter(FilterSpec::new().cities(["Lagos", "Delhi"]));
        let by_city = chart_data(&clean_frame(), &request, &catalog).unwrap();
        assert_eq!(by_city.color.as_deref(), Some("City"));
        assert_eq!(by_city.table.height(), 4);
        assert_eq!(by_city.filename, "chart_data_Delhi_Lagos_Line_Chart.csv");
    }

    #[test]
    fn test_bar_chart_is_mean_by_city() {
        let request = ChartRequest::new(ChartKind::Bar, Metric::Aqi);
        let data = chart_data(&clean_frame(), &request, &ColumnCatalog::air_quality()).unwrap();

        assert_eq!(data.title, "Average AQI by City");
        let means = crate::utils::float_values(&data.table, "AQI").unwrap();
        assert_eq!(means, vec![Some(150.0), Some(50.0), Some(20.0)]);
    }

    #[test]
    fn test_chart_export_keeps_filtered_rows() {
        let request = ChartRequest::new(ChartKind::Bar, Metric::Aqi)
            .with_filter(FilterSpec::new().date_range(d(1), d(2)));
        let data = chart_data(&clean_frame(), &request, &ColumnCatalog::air_quality()).unwrap();

        assert_eq!(data.table.height(), 2);
        assert_eq!(data.export.height(), 4);
        assert_eq!(column_names(&data.export), column_names(&clean_frame()));
    }

    #[test]
    fn test_chart_rejects_unfilterable_column() {
        let co2 = Predicate::NumericRange { min: 0.0, max: 1.0 };
        let request = ChartRequest::new(ChartKind::Line, Metric::Aqi)
            .with_filter(FilterSpec::new().with("CO2", co2));
        let err = chart_data(&clean_frame(), &request, &ColumnCatalog::air_quality()).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_scatter_requires_y_metric() {
        let catalog = ColumnCatalog::air_quality();
        let request = ChartRequest::new(ChartKind::Scatter, Metric::Aqi);
        let err = chart_data(&clean_frame(), &request, &catalog).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_QUERY");

        let data = chart_data(&clean_frame(), &ChartRequest::scatter(Metric::Aqi, Metric::Pm25), &catalog)
            .unwrap();
        assert_eq!(data.title, "PM2.5 vs AQI");
        assert_eq!(column_names(&data.table), vec!["City", "AQI", "PM2.5"]);
    }

    #[test]
    fn test_chart_filename_includes_date_range() {
        let request = ChartRequest::new(ChartKind::Boxplot, Metric::Pm25)
            .with_filter(FilterSpec::new().date_range(d(1), d(2)).range(Metric::Aqi, 0.0, 500.0));
        let data = chart_data(&clean_frame(), &request, &ColumnCatalog::air_quality()).unwrap();
        assert_eq!(data.filename, "chart_data_2023-01-01_to_2023-01-02_Boxplot.csv");
        assert_eq!(data.table.height(), 4);
    }

    #[test]
    fn test_comparison_needs_two_cities() {
        let request = ComparisonRequest::new(["Delhi"], Metric::Aqi, ChartKind::Bar);
        let err = compare_cities(&clean_frame(), &request).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_QUERY");
    }

    #[test]
    fn test_comparison_rejects_line_chart() {
        let request = ComparisonRequest::new(["Delhi", "Lagos"], Metric::Aqi, ChartKind::Line);
        assert!(compare_cities(&clean_frame(), &request).is_err());
    }

    #[test]
    fn test_comparison_summary_table() {
        let request =
            ComparisonRequest::new(["Lagos", "Delhi"], Metric::Aqi, ChartKind::SummaryTable)
                .between(d(1), d(2));
        let data = compare_cities(&clean_frame(), &request).unwrap();

        assert_eq!(data.table.height(), 2);
        assert!(data.export.equals_missing(&data.table));
        assert_eq!(
            data.filename,
            "city_comparison_Delhi_Lagos_2023-01-01_to_2023-01-02_Summary_Table_AQI.csv"
        );
    }

    #[test]
    fn test_comparison_request_from_json() {
        let json = r#"{"cities": ["Delhi", "Paris"], "metric": "PM2.5", "kind": "boxplot"}"#;
        let request: ComparisonRequest = serde_json::from_str(json).unwrap();
        let data = compare_cities(&clean_frame(), &request).unwrap();

        assert_eq!(data.table.height(), 3);
        assert_eq!(data.filename, "city_comparison_Delhi_Paris_Boxplot_PM2.5.csv");
    }
}
