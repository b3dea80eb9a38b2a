use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use thiserror::Error;

use crate::model::{ExchangeRate, FROM_CURRENCY, RATE, TO_CURRENCY};

#[derive(Debug, Error)]
pub enum RateTableError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("rate table is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("rate row {row} has no {column}")]
    MissingCode { row: usize, column: &'static str },
    #[error("more than one rate converts from {0}")]
    DuplicateSource(String),
    #[error("rate for {from_currency} must be a positive finite number, found {rate:?}")]
    InvalidRate {
        from_currency: String,
        rate: Option<f64>,
    },
}

/// Conversion rules keyed by source currency. Each source appears at most once.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: Vec<ExchangeRate>,
    index: HashMap<String, usize>,
}

impl RateTable {
    pub fn from_rates(rates: Vec<ExchangeRate>) -> Result<Self, RateTableError> {
        let mut index = HashMap::with_capacity(rates.len());
        for (position, rate) in rates.iter().enumerate() {
            if !(rate.rate.is_finite() && rate.rate > 0.0) {
                return Err(RateTableError::InvalidRate {
                    from_currency: rate.from_currency.clone(),
                    rate: Some(rate.rate),
                });
            }
            if index.insert(rate.from_currency.clone(), position).is_some() {
                return Err(RateTableError::DuplicateSource(rate.from_currency.clone()));
            }
        }
        Ok(Self { rates, index })
    }

    /// Loads the table from an ingested exchange-rate frame.
    pub fn from_frame(df: &DataFrame) -> Result<Self, RateTableError> {
        if df.height() == 0 {
            return Ok(Self::default());
        }

        let from = require(df, FROM_CURRENCY)?.cast(&DataType::String)?;
        let to = require(df, TO_CURRENCY)?.cast(&DataType::String)?;
        let rate = require(df, RATE)?.cast(&DataType::Float64)?;
        let from = from.str()?;
        let to = to.str()?;
        let rate = rate.f64()?;

        let mut rates = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let from_currency = from.get(idx).ok_or(RateTableError::MissingCode {
                row: idx,
                column: FROM_CURRENCY,
            })?;
            let to_currency = to.get(idx).ok_or(RateTableError::MissingCode {
                row: idx,
                column: TO_CURRENCY,
            })?;
            let Some(value) = rate.get(idx) else {
                return Err(RateTableError::InvalidRate {
                    from_currency: from_currency.to_string(),
                    rate: None,
                });
            };
            rates.push(ExchangeRate {
                from_currency: from_currency.to_string(),
                to_currency: to_currency.to_string(),
                rate: value,
            });
        }

        Self::from_rates(rates)
    }

    pub fn lookup(&self, from_currency: &str) -> Option<&ExchangeRate> {
        self.index.get(from_currency).map(|&idx| &self.rates[idx])
    }

    pub fn source_currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.iter().map(|rate| rate.from_currency.as_str())
    }

    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

fn require<'a>(df: &'a DataFrame, name: &'static str) -> Result<&'a Column, RateTableError> {
    df.column(name)
        .map_err(|_| RateTableError::MissingColumn(name))
}

/// Currency codes a valuation may carry: every rate source, plus the reference
/// currency when one is configured.
#[derive(Debug, Clone, Default)]
pub struct KnownCurrencies {
    codes: HashSet<String>,
}

impl KnownCurrencies {
    pub fn new(table: &RateTable, reference_currency: Option<&str>) -> Self {
        let mut codes: HashSet<String> = table.source_currencies().map(str::to_string).collect();
        if let Some(reference) = reference_currency {
            codes.insert(reference.to_string());
        }
        Self { codes }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
