use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{required, CURRENCY, TIMESTAMP, VALUE};
use crate::rates::KnownCurrencies;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How many rows each predicate rejected. A row failing several checks is counted once per check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub input_rows: usize,
    pub retained_rows: usize,
    pub invalid_timestamp: usize,
    pub invalid_value: usize,
    pub invalid_currency: usize,
}

impl ValidationReport {
    pub fn dropped_rows(&self) -> usize {
        self.input_rows - self.retained_rows
    }
}

/// Drops every row whose timestamp, value or currency is unusable, keeping input order.
pub fn validate_records(
    df: &DataFrame,
    known: &KnownCurrencies,
    today: NaiveDate,
) -> Result<DataFrame> {
    validate_with_report(df, known, today).map(|(filtered, _)| filtered)
}

pub fn validate_with_report(
    df: &DataFrame,
    known: &KnownCurrencies,
    today: NaiveDate,
) -> Result<(DataFrame, ValidationReport)> {
    let len = df.height();
    if len == 0 {
        return Ok((df.clone(), ValidationReport::default()));
    }

    let timestamp_ok = timestamp_mask(required(df, TIMESTAMP)?, today)?;
    let value_ok = value_mask(required(df, VALUE)?)?;
    let currency_ok = currency_mask(required(df, CURRENCY)?, known)?;

    let keep: Vec<bool> = (0..len)
        .map(|idx| timestamp_ok[idx] && value_ok[idx] && currency_ok[idx])
        .collect();

    let report = ValidationReport {
        input_rows: len,
        retained_rows: keep.iter().filter(|&&ok| ok).count(),
        invalid_timestamp: timestamp_ok.iter().filter(|&&ok| !ok).count(),
        invalid_value: value_ok.iter().filter(|&&ok| !ok).count(),
        invalid_currency: currency_ok.iter().filter(|&&ok| !ok).count(),
    };
    debug!(
        input_rows = report.input_rows,
        retained_rows = report.retained_rows,
        invalid_timestamp = report.invalid_timestamp,
        invalid_value = report.invalid_value,
        invalid_currency = report.invalid_currency,
        "validation finished"
    );

    let mask = Series::new("keep".into(), keep);
    let filtered = df.filter(mask.bool()?)?;
    Ok((filtered, report))
}

/// Parses a strict `YYYY-MM-DD` date. Unpadded or otherwise loose forms are refused.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(idx, byte)| match idx {
        4 | 7 => *byte == b'-',
        _ => byte.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

fn timestamp_mask(column: &Column, today: NaiveDate) -> Result<Vec<bool>> {
    if column.dtype() != &DataType::String {
        return Ok(vec![false; column.len()]);
    }
    let timestamps = column.str()?;
    Ok(timestamps
        .into_iter()
        .map(|raw| {
            raw.and_then(parse_timestamp)
                .is_some_and(|date| date < today)
        })
        .collect())
}

fn value_mask(column: &Column) -> Result<Vec<bool>> {
    // Booleans would cast to 0/1; they are not valuations.
    if matches!(column.dtype(), DataType::Boolean) {
        return Ok(vec![false; column.len()]);
    }
    let coerced = column.cast(&DataType::Float64)?;
    let values = coerced.f64()?;
    Ok(values
        .into_iter()
        .map(|value| value.is_some_and(|v| v >= 0.0))
        .collect())
}

fn currency_mask(column: &Column, known: &KnownCurrencies) -> Result<Vec<bool>> {
    if column.dtype() != &DataType::String {
        return Ok(vec![false; column.len()]);
    }
    let currencies = column.str()?;
    Ok(currencies
        .into_iter()
        .map(|code| code.is_some_and(|code| known.contains(code)))
        .collect())
}
