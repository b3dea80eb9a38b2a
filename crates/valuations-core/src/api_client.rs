use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::collaborators::{AggregateSink, DataSet, PublishReport, RecordSource};
use crate::config::ApiConfig;
use crate::error::{PipelineError, Result};
use crate::model::AnnualAggregate;

const PROGRESS_EVERY: usize = 10;

/// JSON-over-HTTP client for the valuation API.
pub struct ApiClient {
    http: Client,
    base_url: String,
    exchange_rates_endpoint: String,
    monthly_data_endpoint: String,
    annual_data_endpoint: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PipelineError::Config("api.base_url must be set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            exchange_rates_endpoint: config.exchange_rates_endpoint.clone(),
            monthly_data_endpoint: config.monthly_data_endpoint.clone(),
            annual_data_endpoint: config.annual_data_endpoint.clone(),
        })
    }

    pub fn url(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }

    /// GETs an endpoint; non-2xx statuses are errors.
    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        let value = self
            .http
            .get(self.url(endpoint))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }

    /// POSTs one JSON body. Non-JSON response bodies come back as a string value.
    pub async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Value> {
        let response = self
            .http
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn endpoint_for(&self, data_set: DataSet) -> &str {
        match data_set {
            DataSet::ExchangeRates => &self.exchange_rates_endpoint,
            DataSet::MonthlyValuations => &self.monthly_data_endpoint,
        }
    }
}

fn join_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn fetch(&self, data_set: DataSet) -> Result<Value> {
        self.get(self.endpoint_for(data_set)).await
    }
}

#[async_trait]
impl AggregateSink for ApiClient {
    async fn publish(&self, rows: &[AnnualAggregate]) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        let endpoint = self.annual_data_endpoint.as_str();

        if rows.is_empty() {
            warn!(endpoint, "empty batch provided to publish");
            return Ok(report);
        }

        info!(endpoint, total = rows.len(), "starting publish");
        for (idx, row) in rows.iter().enumerate() {
            match self.post(endpoint, row).await {
                Ok(response) => {
                    report.record_success(response);
                    if report.success_count % PROGRESS_EVERY == 0 || report.success_count == rows.len() {
                        info!(
                            published = report.success_count,
                            total = rows.len(),
                            "publish progress"
                        );
                    }
                }
                Err(err) => {
                    warn!(row = idx, error = %err, "failed to publish row");
                    report.record_failure(row, &err);
                }
            }
        }

        Ok(report)
    }
}
