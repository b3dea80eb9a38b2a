// crates/valuations-core/src/error.rs

use thiserror::Error;

use crate::rates::RateTableError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("required column '{0}' is missing from the batch")]
    MissingColumn(&'static str),

    #[error("exchange rate table rejected: {0}")]
    RateTable(#[from] RateTableError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "runtime")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Data processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
