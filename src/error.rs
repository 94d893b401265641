use std::path::PathBuf;
use thiserror::Error;

/// Startup failure while reading the boundary or forecast tables.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Input file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid boundary geometry for {subdivision:?}: {reason}")]
    Geometry { subdivision: String, reason: String },

    #[error("Invalid date {value:?} on forecast row {row}")]
    Date { row: usize, value: String },
}

/// Malformed dashboard configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid color {0:?} (expected #rrggbb or #rrggbbaa)")]
    InvalidColor(String),

    #[error("Invalid color scale: {0}")]
    InvalidScale(String),
}
