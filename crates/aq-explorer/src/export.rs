//! Export filename construction.
//!
//! Identical query parameters always produce the identical filename.

use chrono::NaiveDate;

/// Prefix for exports of a filtered dataset.
pub const FILTERED_PREFIX: &str = "filtered_air_quality";

/// Prefix for exports of chart data.
pub const CHART_PREFIX: &str = "chart_data";

/// Prefix for exports of a city comparison.
pub const COMPARISON_PREFIX: &str = "city_comparison";

const EXTENSION: &str = ".csv";

/// Join `prefix` and each descriptor with underscores and append `.csv`.
///
/// Descriptors are expected to be sanitized already. Empty descriptors are
/// skipped.
pub fn build_filename<S: AsRef<str>>(prefix: &str, descriptors: &[S]) -> String {
    let mut name = String::from(prefix);
    for descriptor in descriptors.iter().map(AsRef::as_ref) {
        if descriptor.is_empty() {
            continue;
        }
        name.push('_');
        name.push_str(descriptor);
    }
    name.push_str(EXTENSION);
    name
}

/// Replace spaces with underscores.
pub fn sanitize_descriptor(raw: &str) -> String {
    raw.replace(' ', "_")
}

/// Cities sorted and joined with underscores.
pub fn city_descriptor<'a>(cities: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<String> = cities.into_iter().map(sanitize_descriptor).collect();
    names.sort();
    names.dedup();
    names.join("_")
}

/// `YYYY-MM-DD_to_YYYY-MM-DD`.
pub fn date_range_descriptor(start: NaiveDate, end: NaiveDate) -> String {
    format!("{}_to_{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filename() {
        assert_eq!(
            build_filename(FILTERED_PREFIX, &["Delhi_Lagos", "2023-01-01_to_2023-01-31"]),
            "filtered_air_quality_Delhi_Lagos_2023-01-01_to_2023-01-31.csv"
        );
    }

    #[test]
    fn test_build_filename_without_descriptors() {
        let none: [&str; 0] = [];
        assert_eq!(build_filename(CHART_PREFIX, &none), "chart_data.csv");
        assert_eq!(build_filename(CHART_PREFIX, &["", "AQI"]), "chart_data_AQI.csv");
    }

    #[test]
    fn test_city_descriptor_is_order_independent() {
        assert_eq!(city_descriptor(["Lagos", "Delhi"]), "Delhi_Lagos");
        assert_eq!(city_descriptor(["Delhi", "Lagos"]), "Delhi_Lagos");
        assert_eq!(city_descriptor(["New York", "Delhi"]), "Delhi_New_York");
    }

    #[test]
    fn test_date_range_descriptor() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert_eq!(date_range_descriptor(start, end), "2023-01-01_to_2023-01-31");
    }

    #[test]
    fn test_sanitize_descriptor() {
        assert_eq!(sanitize_descriptor("Line Chart"), "Line_Chart");
        assert_eq!(sanitize_descriptor("AQI"), "AQI");
    }
}
