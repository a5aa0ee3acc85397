//! Error types for the map pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a map from being produced.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("{what} not found: {}", path.display())]
    InputNotFound { what: &'static str, path: PathBuf },

    #[error("Required column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Invalid value in row {row}, column '{column}': {value:?} ({reason})")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        reason: &'static str,
    },

    #[error("Site table is empty")]
    EmptySiteTable,

    #[error("Unsupported input format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid configuration: {name} = {value} ({reason})")]
    InvalidConfig {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Figure is {actual_w}x{actual_h} px, expected {expected_w}x{expected_h} px")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapError {
    /// Shorthand for an [`MapError::InvalidConfig`] with a displayable value.
    pub fn invalid_config(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        MapError::InvalidConfig {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by configuration rather than input data.
    pub fn is_config_error(&self) -> bool {
        matches!(self, MapError::InvalidConfig { .. } | MapError::ConfigParse(_))
    }
}

/// Result type alias for map operations
pub type Result<T> = std::result::Result<T, MapError>;
