//! Configuration for the cleaning pipeline.
//!
//! Uses the builder pattern for ergonomic setup. Every knob here is a
//! dataset-level constant (drop-list, Tukey multiplier, accepted date
//! formats) rather than logic, so a new dataset can adjust them without
//! touching the pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExplorerError, Result};
use crate::schema::{CO2_COLUMN, ColumnCatalog};

/// Default Tukey fence multiplier.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Configuration for the cleaning pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use aq_explorer::config::CleaningConfig;
///
/// let config = CleaningConfig::builder()
///     .drop_columns(["CO2"])
///     .iqr_multiplier(1.5)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Expected columns and their roles.
    #[serde(default)]
    pub catalog: ColumnCatalog,

    /// Columns removed unconditionally during pruning.
    /// Default: ["CO2"] (about 82% missing in the reference dataset)
    pub drop_columns: Vec<String>,

    /// Multiplier applied to the IQR when computing outlier fences.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Additional chrono format strings tried when parsing dates.
    /// Built-in ISO layouts are always tried first.
    /// Default: empty
    #[serde(default)]
    pub extra_date_formats: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            catalog: ColumnCatalog::air_quality(),
            drop_columns: vec![CO2_COLUMN.to_string()],
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            extra_date_formats: Vec::new(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: CleaningConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .map_err(|e| ExplorerError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(self.iqr_multiplier));
        }

        if let Some(col) = self
            .drop_columns
            .iter()
            .find(|c| self.catalog.required_columns().any(|r| r == c.as_str()))
        {
            return Err(ConfigValidationError::DropsRequiredColumn(col.clone()));
        }

        if self.catalog.date_column().is_none() {
            return Err(ConfigValidationError::MissingDateColumn);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid IQR multiplier: {0} (must be finite and non-negative)")]
    InvalidMultiplier(f64),

    #[error("Column '{0}' is required and cannot be on the drop-list")]
    DropsRequiredColumn(String),

    #[error("Catalog declares no date column")]
    MissingDateColumn,
}

impl From<ConfigValidationError> for ExplorerError {
    fn from(err: ConfigValidationError) -> Self {
        ExplorerError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    catalog: Option<ColumnCatalog>,
    drop_columns: Option<Vec<String>>,
    iqr_multiplier: Option<f64>,
    extra_date_formats: Vec<String>,
}

impl CleaningConfigBuilder {
    /// Use a custom column catalog.
    pub fn catalog(mut self, catalog: ColumnCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the drop-list.
    pub fn drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the Tukey fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Accept one more chrono date format, e.g. `"%d/%m/%Y"`.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.extra_date_formats.push(format.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            catalog: self.catalog.unwrap_or_default(),
            drop_columns: self
                .drop_columns
                .unwrap_or_else(|| vec![CO2_COLUMN.to_string()]),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(DEFAULT_IQR_MULTIPLIER),
            extra_date_formats: self.extra_date_formats,
        };

        config.validate()?;
        Ok(config)
    }
}
