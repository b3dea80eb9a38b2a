use chrono::Datelike;
use polars::df;
use polars::lazy::dsl::*;
use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::model::{required, AnnualAggregate, COMPANY, CURRENCY, TIMESTAMP, VALUE, YEAR};
use crate::validation::parse_timestamp;

/// Averages converted valuations per (company, year, currency).
///
/// Expects validated rows: an unparseable timestamp is an error here, not a filter.
/// Rows without a company or currency cannot be keyed and are left out. The output is
/// sorted by company, then year, then currency.
pub fn annual_aggregation(df: &DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Ok(empty_aggregates()?);
    }

    let timestamps = required(df, TIMESTAMP)?.cast(&DataType::String)?;
    let companies = required(df, COMPANY)?.cast(&DataType::String)?;
    let currencies = required(df, CURRENCY)?.cast(&DataType::String)?;
    let values = required(df, VALUE)?.cast(&DataType::Float64)?;

    let mut years: Vec<i32> = Vec::with_capacity(df.height());
    for (idx, raw) in timestamps.str()?.into_iter().enumerate() {
        let date = raw.and_then(parse_timestamp).ok_or_else(|| {
            PipelineError::Processing(format!(
                "row {idx} has timestamp {raw:?}, which is not a YYYY-MM-DD date"
            ))
        })?;
        years.push(date.year());
    }

    let working = DataFrame::new(vec![
        companies,
        Series::new(YEAR.into(), years).into(),
        currencies,
        values,
    ])?;

    let aggregated = working
        .lazy()
        .filter(col(COMPANY).is_not_null().and(col(CURRENCY).is_not_null()))
        .group_by([col(COMPANY), col(YEAR), col(CURRENCY)])
        .agg([col(VALUE).mean()])
        .sort([COMPANY, YEAR, CURRENCY], SortMultipleOptions::default())
        .collect()?;

    debug!(
        rows = df.height(),
        groups = aggregated.height(),
        "annual aggregation finished"
    );

    Ok(aggregated)
}

fn empty_aggregates() -> PolarsResult<DataFrame> {
    df![
        COMPANY => Vec::<&str>::new(),
        YEAR => Vec::<i32>::new(),
        CURRENCY => Vec::<&str>::new(),
        VALUE => Vec::<f64>::new(),
    ]
}

/// Reads an aggregation frame back into typed rows, in frame order.
pub fn aggregates_from_frame(df: &DataFrame) -> Result<Vec<AnnualAggregate>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let companies = required(df, COMPANY)?.str()?;
    let years = required(df, YEAR)?.i32()?;
    let currencies = required(df, CURRENCY)?.str()?;
    let values = required(df, VALUE)?.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let (Some(company), Some(year), Some(currency), Some(value)) = (
            companies.get(idx),
            years.get(idx),
            currencies.get(idx),
            values.get(idx),
        ) else {
            return Err(PipelineError::Processing(format!(
                "aggregate row {idx} has a missing field"
            )));
        };

        rows.push(AnnualAggregate {
            company: company.to_string(),
            year,
            currency: currency.to_string(),
            value,
        });
    }

    Ok(rows)
}
