use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const TIMESTAMP: &str = "timestamp";
pub const VALUE: &str = "value";
pub const CURRENCY: &str = "currency";
pub const COMPANY: &str = "company";
pub const YEAR: &str = "year";

pub const FROM_CURRENCY: &str = "from_currency";
pub const TO_CURRENCY: &str = "to_currency";
pub const RATE: &str = "rate";

/// One company's valuation observation, as delivered by the monthly data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub timestamp: String,
    pub value: f64,
    pub currency: String,
    pub company: String,
}

/// A single conversion rule: `amount * rate` turns `from_currency` into `to_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
}

/// Mean valuation for one company, one calendar year and one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualAggregate {
    pub company: String,
    pub year: i32,
    pub currency: String,
    pub value: f64,
}

/// Builds a working table from typed records, with the same column layout ingestion produces.
pub fn valuation_frame(records: &[ValuationRecord]) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = vec![
        Series::new(
            TIMESTAMP.into(),
            records
                .iter()
                .map(|r| r.timestamp.as_str())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            VALUE.into(),
            records.iter().map(|r| r.value).collect::<Vec<f64>>(),
        )
        .into(),
        Series::new(
            CURRENCY.into(),
            records
                .iter()
                .map(|r| r.currency.as_str())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            COMPANY.into(),
            records
                .iter()
                .map(|r| r.company.as_str())
                .collect::<Vec<_>>(),
        )
        .into(),
    ];

    DataFrame::new(columns)
}

pub(crate) fn required<'a>(df: &'a DataFrame, name: &'static str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| PipelineError::MissingColumn(name))
}
