//! Error types for loading, cleaning and enriching AIS data.

use thiserror::Error;

/// Errors raised while loading settings, data files or vessel metadata, or
/// while enriching reports.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Vessel '{0}' not found in vessel registry")]
    UnknownVessel(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failures of the vessel registry scraper, kept apart by kind so callers can
/// log what went wrong before falling back to defaults.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Missing field in response: {0}")]
    MissingField(&'static str),
}

impl ScrapeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Network(_) | ScrapeError::Status(_) => "network",
            ScrapeError::Parse(_) => "parse",
            ScrapeError::MissingField(_) => "missing-field",
        }
    }
}
