use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::pipeline::PipelineContext;

pub const BASE_URL_ENV: &str = "VALUATIONS_API_BASE_URL";
pub const REFERENCE_CURRENCY_ENV: &str = "VALUATIONS_REFERENCE_CURRENCY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub exchange_rates_endpoint: String,
    pub monthly_data_endpoint: String,
    pub annual_data_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            exchange_rates_endpoint: "exchange-rates".to_string(),
            monthly_data_endpoint: "monthly-data".to_string(),
            annual_data_endpoint: "annual-data".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Always accepted by validation; conversions target this code.
    pub reference_currency: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_currency: Some("SEK".to_string()),
        }
    }
}

impl AppConfig {
    /// Reads the TOML file when given (defaults otherwise), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    PipelineError::Config(format!(
                        "Failed to read config file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// An empty reference-currency override disables the reference currency.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            self.api.base_url = Some(base_url);
        }
        if let Some(code) = lookup(REFERENCE_CURRENCY_ENV) {
            let code = code.trim().to_string();
            self.pipeline.reference_currency = if code.is_empty() { None } else { Some(code) };
        }
    }

    pub fn base_url(&self) -> Result<&str> {
        self.api
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "api.base_url (or {BASE_URL_ENV}) must be set"
                ))
            })
    }

    pub fn pipeline_context(&self, today: NaiveDate) -> PipelineContext {
        PipelineContext {
            today,
            reference_currency: self.pipeline.reference_currency.clone(),
        }
    }
}
