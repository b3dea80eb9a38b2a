use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    aggregation::annual_aggregation,
    currency::convert_currency,
    error::Result,
    ingestion::payload_to_frame,
    rates::{KnownCurrencies, RateTable},
    validation::{validate_with_report, ValidationReport},
};

/// Inputs that are fixed for one run but must not be read from ambient state.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Records dated on or after this day are rejected.
    pub today: NaiveDate,
    /// Accepted during validation even when no rate converts from it.
    pub reference_currency: Option<String>,
}

impl PipelineContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            reference_currency: None,
        }
    }

    pub fn with_reference_currency(mut self, code: impl Into<String>) -> Self {
        self.reference_currency = Some(code.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub today: NaiveDate,
    pub reference_currency: Option<String>,
    pub rate_count: usize,
    pub validation: ValidationReport,
    pub aggregate_rows: usize,
}

pub struct PipelineOutput {
    pub aggregates: DataFrame,
    pub summary: PipelineSummary,
}

/// Ingests both raw payloads and runs the full transformation.
pub fn run_pipeline(
    valuations: &Value,
    rates: &Value,
    context: &PipelineContext,
) -> Result<PipelineOutput> {
    let rate_frame = payload_to_frame(rates)?;
    let rate_table = RateTable::from_frame(&rate_frame)?;
    let valuation_frame = payload_to_frame(valuations)?;
    info!(
        valuation_rows = valuation_frame.height(),
        rate_rows = rate_table.len(),
        "payloads ingested"
    );

    run_frames(&valuation_frame, &rate_table, context)
}

/// Validation, conversion and aggregation over an already ingested batch.
pub fn run_frames(
    valuations: &DataFrame,
    rate_table: &RateTable,
    context: &PipelineContext,
) -> Result<PipelineOutput> {
    let run_id = Uuid::new_v4();
    let known = KnownCurrencies::new(rate_table, context.reference_currency.as_deref());

    let (validated, validation) = validate_with_report(valuations, &known, context.today)?;
    info!(
        %run_id,
        retained = validation.retained_rows,
        dropped = validation.dropped_rows(),
        "invalid rows removed"
    );

    let converted = convert_currency(&validated, rate_table)?;
    info!(%run_id, rows = converted.height(), "currencies converted");

    let aggregates = annual_aggregation(&converted)?;
    info!(%run_id, groups = aggregates.height(), "annual aggregations produced");

    let summary = PipelineSummary {
        run_id,
        today: context.today,
        reference_currency: context.reference_currency.clone(),
        rate_count: rate_table.len(),
        validation,
        aggregate_rows: aggregates.height(),
    };

    Ok(PipelineOutput {
        aggregates,
        summary,
    })
}
