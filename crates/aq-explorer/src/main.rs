//! CLI entry point for the air-quality explorer.

use anyhow::{Context, Result, anyhow, bail};
use aq_explorer::quality::DEFAULT_PREVIEW_ROWS;
use aq_explorer::utils::parse_date_strict;
use aq_explorer::{
    ChartData, ChartKind, ChartRequest, CleanDataset, CleaningConfig, ComparisonRequest,
    FilterSpec, Metric, Session,
};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Air-quality dataset cleaning and exploration",
    long_about = "Cleans a raw air-quality CSV and answers filter, chart and comparison queries.\n\n\
                  EXAMPLES:\n  \
                  # Show cleaning diagnostics\n  \
                  aq-explorer -i Air_Quality.csv clean\n\n  \
                  # Filter and export\n  \
                  aq-explorer -i Air_Quality.csv filter --city Delhi --city Lagos --range AQI=0:100 --export\n\n  \
                  # Compare cities\n  \
                  aq-explorer -i Air_Quality.csv compare --city Delhi --city Lagos --metric PM2.5 --kind summary"
)]
struct Args {
    /// Path to the raw CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Directory that exports are written to
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// JSON file with a cleaning configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Print JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cleaning pipeline and print its diagnostics
    Clean {
        /// Number of raw and clean rows to preview
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        preview: usize,
    },
    /// Filter the clean dataset
    Filter {
        #[command(flatten)]
        selection: Selection,

        /// Metric range as METRIC=MIN:MAX (repeatable)
        #[arg(long = "range", value_name = "METRIC=MIN:MAX")]
        ranges: Vec<String>,

        /// Write the result to the output directory
        #[arg(long)]
        export: bool,
    },
    /// Prepare chart data from the clean dataset
    Chart {
        /// Chart kind (line, bar, box, scatter, summary)
        #[arg(long, default_value = "line")]
        kind: ChartKind,

        /// Metric to plot (x axis for scatter plots)
        #[arg(long, default_value = "AQI")]
        metric: Metric,

        /// Y axis metric for scatter plots
        #[arg(long)]
        y_metric: Option<Metric>,

        #[command(flatten)]
        selection: Selection,

        #[arg(long)]
        export: bool,
    },
    /// Compare two or more cities on one metric
    Compare {
        /// Chart kind (bar, box, summary)
        #[arg(long, default_value = "bar")]
        kind: ChartKind,

        #[arg(long, default_value = "AQI")]
        metric: Metric,

        #[command(flatten)]
        selection: Selection,

        #[arg(long)]
        export: bool,
    },
}

/// City and date options shared by the query subcommands.
#[derive(ClapArgs, Debug)]
struct Selection {
    /// City to include (repeatable)
    #[arg(long = "city")]
    cities: Vec<String>,

    /// First day of the date range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Last day of the date range (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = match &args.config {
        Some(path) => CleaningConfig::from_json_file(path)
            .with_context(|| format!("Loading config from {}", path.display()))?,
        None => CleaningConfig::default(),
    };

    info!("Loading dataset from: {}", args.input.display());
    let raw = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", raw.shape());

    let session = Session::with_config(raw, config)?;

    match &args.command {
        Command::Clean { preview } => run_clean(&session, *preview, &args),
        Command::Filter {
            selection,
            ranges,
            export,
        } => {
            let mut spec = selection.filter_spec(&session)?;
            for range in ranges {
                let (metric, min, max) = parse_range(range)?;
                spec = spec.range(metric, min, max);
            }
            run_filter(&session, &spec, *export, &args)
        }
        Command::Chart {
            kind,
            metric,
            y_metric,
            selection,
            export,
        } => {
            let request = ChartRequest {
                kind: *kind,
                metric: *metric,
                y_metric: *y_metric,
                filter: selection.filter_spec(&session)?,
            };
            let data = session.chart(&request)?;
            report_chart(&data, *export, &args)
        }
        Command::Compare {
            kind,
            metric,
            selection,
            export,
        } => {
            let mut request = ComparisonRequest::new(selection.cities.clone(), *metric, *kind);
            if let Some((start, end)) = selection.date_range(&session)? {
                request = request.between(start, end);
            }
            let data = session.compare(&request)?;
            report_chart(&data, *export, &args)
        }
    }
}

impl Selection {
    /// Missing ends of a date range default to the clean dataset's bounds.
    fn date_range(&self, session: &Session) -> Result<Option<(NaiveDate, NaiveDate)>> {
        if self.from.is_none() && self.to.is_none() {
            return Ok(None);
        }
        let Some((min_date, max_date)) = session.date_bounds()? else {
            bail!("Clean dataset has no dates to filter on");
        };
        let start = match &self.from {
            Some(raw) => parse_date_strict("from", raw)?,
            None => min_date,
        };
        let end = match &self.to {
            Some(raw) => parse_date_strict("to", raw)?,
            None => max_date,
        };
        Ok(Some((start, end)))
    }

    fn filter_spec(&self, session: &Session) -> Result<FilterSpec> {
        let mut spec = FilterSpec::new();
        if !self.cities.is_empty() {
            spec = spec.cities(self.cities.iter().cloned());
        }
        if let Some((start, end)) = self.date_range(session)? {
            spec = spec.date_range(start, end);
        }
        Ok(spec)
    }
}

/// Parse `METRIC=MIN:MAX`.
fn parse_range(raw: &str) -> Result<(Metric, f64, f64)> {
    let (metric, bounds) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected METRIC=MIN:MAX, got '{}'", raw))?;
    let (min, max) = bounds
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected MIN:MAX after '=', got '{}'", bounds))?;

    let metric: Metric = metric.parse()?;
    let min: f64 = min.trim().parse().with_context(|| format!("Invalid minimum in '{}'", raw))?;
    let max: f64 = max.trim().parse().with_context(|| format!("Invalid maximum in '{}'", raw))?;
    Ok((metric, min, max))
}

/// Load a CSV file with a header row.
fn load_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
}

/// Write `df` as CSV into the output directory.
fn write_export(df: &DataFrame, output_dir: &Path, filename: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(filename);
    let mut file = File::create(&path)?;
    let mut df = df.clone();

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;

    info!("Export saved: {}", path.display());
    Ok(path)
}

/// Print cleaning diagnostics.
///
/// Uses `println!` for the report itself so it is visible regardless of
/// log level.
fn run_clean(session: &Session, preview: usize, args: &Args) -> Result<()> {
    let clean = session.clean()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(clean.diagnostics())?);
        return Ok(());
    }

    let raw = session.raw();
    println!("\n{}", "=".repeat(80));
    println!("RAW DATA");
    println!("{}", "=".repeat(80));
    println!("  File: {}", args.input.display());
    println!("  Rows: {}", raw.height());
    println!("  Columns: {}", raw.width());
    println!();
    println!("{}", session.raw_preview(preview));
    println!();

    println!("COLUMN INFO");
    println!("{}", "-".repeat(40));
    println!("{:<12} {:<12} {:<10}", "Column", "Type", "Non-Null");
    for column in &session.raw_info().columns {
        println!(
            "{:<12} {:<12} {:<10}",
            column.name, column.dtype, column.non_null_count
        );
    }
    println!();

    print_cleaning_summary(clean, session.config().iqr_multiplier)?;

    println!("CLEAN DATA (first {} rows)", preview);
    println!("{}", "-".repeat(40));
    println!("{}", clean.data().head(Some(preview)));
    println!();
    println!("Final cleaned dataset shape: {:?}", clean.data().shape());

    Ok(())
}

fn print_cleaning_summary(clean: &CleanDataset, iqr_multiplier: f64) -> Result<()> {
    let diagnostics = clean.diagnostics();

    println!("MISSING VALUES");
    println!("{}", "-".repeat(40));
    println!("{}", diagnostics.null_audit_frame()?);
    for dropped in &diagnostics.dropped_columns {
        if let Some(audit) = diagnostics.null_audit_for(dropped) {
            println!(
                "  {} has {:.2}% missing values and was dropped",
                dropped, audit.null_percentage
            );
        }
    }
    println!();

    if !diagnostics.coercion_issues.is_empty() {
        println!("UNPARSEABLE CELLS");
        println!("{}", "-".repeat(40));
        for issue in &diagnostics.coercion_issues {
            println!(
                "  {}: {} cells not a {} (e.g. {:?})",
                issue.column, issue.failed_cells, issue.target_type, issue.examples
            );
        }
        println!();
    }

    println!("OUTLIER FILTERING (IQR x {})", iqr_multiplier);
    println!("{}", "-".repeat(40));
    println!("{}", diagnostics.outlier_frame()?);
    for report in diagnostics.outliers.iter().filter(|r| r.lower.is_none()) {
        println!(
            "  {} had no values left; all {} rows were removed",
            report.column, report.rows_before
        );
    }
    println!();

    println!("STAGES");
    println!("{}", "-".repeat(40));
    for stage in &diagnostics.stages {
        println!(
            "  {:<20} rows {:>7} -> {:<7} columns {:>3} -> {:<3}",
            stage.stage.display_name(),
            stage.rows_in,
            stage.rows_out,
            stage.columns_in,
            stage.columns_out
        );
    }
    println!();

    Ok(())
}

fn run_filter(session: &Session, spec: &FilterSpec, export: bool, args: &Args) -> Result<()> {
    let filtered = session.filter(spec)?;
    let filename = session.filter_filename(spec);

    if export {
        write_export(&filtered, &args.output, &filename)?;
    }

    if args.json {
        let summary = serde_json::json!({
            "rows": filtered.height(),
            "filter": spec,
            "filename": filename,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if filtered.height() == 0 {
        println!("No rows match the selected filters.");
        return Ok(());
    }
    println!("{}", filtered);
    println!("{} rows match. Export filename: {}", filtered.height(), filename);
    Ok(())
}

fn report_chart(data: &ChartData, export: bool, args: &Args) -> Result<()> {
    if export {
        write_export(&data.export, &args.output, &data.filename)?;
    }

    if args.json {
        let summary = serde_json::json!({
            "kind": data.kind,
            "title": data.title,
            "x": data.x,
            "y": data.y,
            "color": data.color,
            "rows": data.table.height(),
            "filename": data.filename,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", data.title);
    println!("{}", "-".repeat(40));
    if data.table.height() == 0 {
        println!("No data for the selected options.");
    } else {
        println!("{}", data.table);
    }
    println!("x: {}  y: {}  color: {}", data.x, data.y, data.color.as_deref().unwrap_or("-"));
    println!("Export filename: {}", data.filename);
    Ok(())
}
