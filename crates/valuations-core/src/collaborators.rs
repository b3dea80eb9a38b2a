use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    aggregation::aggregates_from_frame,
    error::Result,
    model::AnnualAggregate,
    pipeline::{run_pipeline, PipelineContext, PipelineSummary},
};

/// Raw inputs the pipeline asks its source for, by logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSet {
    ExchangeRates,
    MonthlyValuations,
}

impl DataSet {
    pub fn label(&self) -> &'static str {
        match self {
            DataSet::ExchangeRates => "exchange rate data",
            DataSet::MonthlyValuations => "monthly valuation data",
        }
    }
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, data_set: DataSet) -> Result<Value>;
}

#[async_trait]
pub trait AggregateSink: Send + Sync {
    /// Delivers every row it can. Per-row failures belong in the report, not in `Err`.
    async fn publish(&self, rows: &[AnnualAggregate]) -> Result<PublishReport>;
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    pub record: AnnualAggregate,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<Value>,
    pub failed_records: Vec<FailedRecord>,
}

impl PublishReport {
    pub fn record_success(&mut self, response: Value) {
        self.success_count += 1;
        self.responses.push(response);
    }

    pub fn record_failure(&mut self, record: &AnnualAggregate, error: impl ToString) {
        self.failure_count += 1;
        self.failed_records.push(FailedRecord {
            record: record.clone(),
            error: error.to_string(),
        });
    }

    pub fn attempted(&self) -> usize {
        self.success_count + self.failure_count
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: PipelineSummary,
    pub publish: PublishReport,
}

/// Fetch, transform, publish. Source failures abort the run; sink failures are counted.
pub async fn run_with(
    source: &dyn RecordSource,
    sink: &dyn AggregateSink,
    context: &PipelineContext,
) -> Result<RunReport> {
    let rates = source.fetch(DataSet::ExchangeRates).await?;
    info!(data_set = DataSet::ExchangeRates.label(), "extracted");
    let valuations = source.fetch(DataSet::MonthlyValuations).await?;
    info!(data_set = DataSet::MonthlyValuations.label(), "extracted");

    let output = run_pipeline(&valuations, &rates, context)?;
    let rows = aggregates_from_frame(&output.aggregates)?;

    if rows.is_empty() {
        warn!("no annual aggregates to publish");
    }
    let publish = sink.publish(&rows).await?;
    info!(
        successes = publish.success_count,
        failures = publish.failure_count,
        "publish complete"
    );

    Ok(RunReport {
        summary: output.summary,
        publish,
    })
}
