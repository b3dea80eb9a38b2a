use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::model::{required, CURRENCY, VALUE};
use crate::rates::RateTable;

/// Rewrites `value` and `currency` for every row whose currency has a rate.
///
/// Rows without a matching rate are already in the reference currency and pass through
/// untouched. Values are multiplied without rounding; the output `value` column is Float64.
pub fn convert_currency(df: &DataFrame, rates: &RateTable) -> Result<DataFrame> {
    let len = df.height();
    if len == 0 {
        return Ok(df.clone());
    }

    let values = required(df, VALUE)?.cast(&DataType::Float64)?;
    let currencies = required(df, CURRENCY)?.cast(&DataType::String)?;
    let values = values.f64()?;
    let currencies = currencies.str()?;

    let mut converted_values: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut converted_currencies: Vec<Option<&str>> = Vec::with_capacity(len);
    let mut converted_rows = 0usize;

    for idx in 0..len {
        let value = values.get(idx);
        let currency = currencies.get(idx);

        match currency.and_then(|code| rates.lookup(code)) {
            Some(rate) => {
                converted_values.push(value.map(|amount| amount * rate.rate));
                converted_currencies.push(Some(rate.to_currency.as_str()));
                converted_rows += 1;
            }
            None => {
                converted_values.push(value);
                converted_currencies.push(currency);
            }
        }
    }

    debug!(
        rows = len,
        converted_rows,
        passed_through = len - converted_rows,
        "currency conversion finished"
    );

    let mut output = df.clone();
    output.with_column(Series::new(VALUE.into(), converted_values))?;
    output.with_column(Series::new(CURRENCY.into(), converted_currencies))?;
    Ok(output)
}
