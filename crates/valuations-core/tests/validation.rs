use anyhow::Result;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde_json::{json, Value};
use valuations_core::error::PipelineError;
use valuations_core::ingestion::payload_to_frame;
use valuations_core::model::ExchangeRate;
use valuations_core::rates::{KnownCurrencies, RateTable};
use valuations_core::validation::{validate_records, validate_with_report};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn known(reference: Option<&str>) -> KnownCurrencies {
    let rates = RateTable::from_rates(vec![
        ExchangeRate {
            from_currency: "USD".into(),
            to_currency: "SEK".into(),
            rate: 10.0,
        },
        ExchangeRate {
            from_currency: "EUR".into(),
            to_currency: "SEK".into(),
            rate: 11.0,
        },
    ])
    .unwrap();
    KnownCurrencies::new(&rates, reference)
}

fn row(company: &str, timestamp: Value, value: Value, currency: Value) -> Value {
    json!({"company": company, "timestamp": timestamp, "value": value, "currency": currency})
}

fn companies(df: &DataFrame) -> Vec<String> {
    df.column("company")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|c| c.unwrap_or_default().to_string())
        .collect()
}

#[test]
fn keeps_only_rows_passing_all_three_checks() -> Result<()> {
    let df = payload_to_frame(&json!([
        row("ok", json!("2023-06-01"), json!(100), json!("USD")),
        row("negative", json!("2023-06-01"), json!(-5), json!("USD")),
        row("unknown_currency", json!("2023-06-01"), json!(100), json!("XYZ")),
        row("bad_date", json!("2023-02-30"), json!(100), json!("USD")),
        row("zero", json!("2023-06-01"), json!(0), json!("EUR")),
    ]))?;

    let (filtered, report) = validate_with_report(&df, &known(None), today())?;

    assert_eq!(companies(&filtered), vec!["ok", "zero"]);
    assert_eq!(report.input_rows, 5);
    assert_eq!(report.retained_rows, 2);
    assert_eq!(report.dropped_rows(), 3);
    assert_eq!(report.invalid_value, 1);
    assert_eq!(report.invalid_currency, 1);
    assert_eq!(report.invalid_timestamp, 1);
    Ok(())
}

#[test]
fn today_is_rejected_and_yesterday_is_accepted() -> Result<()> {
    let yesterday = (today() - Duration::days(1)).format("%Y-%m-%d").to_string();
    let same_day = today().format("%Y-%m-%d").to_string();
    let tomorrow = (today() + Duration::days(1)).format("%Y-%m-%d").to_string();

    let df = payload_to_frame(&json!([
        row("yesterday", json!(yesterday), json!(1), json!("USD")),
        row("today", json!(same_day), json!(1), json!("USD")),
        row("tomorrow", json!(tomorrow), json!(1), json!("USD")),
    ]))?;

    let filtered = validate_records(&df, &known(None), today())?;
    assert_eq!(companies(&filtered), vec!["yesterday"]);
    Ok(())
}

#[test]
fn malformed_timestamps_fail_closed() -> Result<()> {
    let df = payload_to_frame(&json!([
        row("unpadded", json!("2023-6-1"), json!(1), json!("USD")),
        row("slashes", json!("2023/06/01"), json!(1), json!("USD")),
        row("datetime", json!("2023-06-01 10:00:00"), json!(1), json!("USD")),
        row("number", json!(20230601), json!(1), json!("USD")),
        row("missing", Value::Null, json!(1), json!("USD")),
        row("good", json!("2023-06-01"), json!(1), json!("USD")),
    ]))?;

    let filtered = validate_records(&df, &known(None), today())?;
    assert_eq!(companies(&filtered), vec!["good"]);
    Ok(())
}

#[test]
fn timestamp_column_without_strings_rejects_everything() -> Result<()> {
    let df = payload_to_frame(&json!([
        row("a", json!(20230601), json!(1), json!("USD")),
        row("b", json!(20230701), json!(1), json!("USD")),
    ]))?;

    let filtered = validate_records(&df, &known(None), today())?;
    assert_eq!(filtered.height(), 0);
    Ok(())
}

#[test]
fn values_are_coerced_and_non_numeric_values_dropped() -> Result<()> {
    let df = payload_to_frame(&json!([
        row("numeric_text", json!("2023-06-01"), json!("12.5"), json!("USD")),
        row("garbage", json!("2023-06-01"), json!("abc"), json!("USD")),
        row("null", json!("2023-06-01"), Value::Null, json!("USD")),
        row("negative_text", json!("2023-06-01"), json!("-1"), json!("USD")),
        row("integer", json!("2023-06-01"), json!(7), json!("USD")),
    ]))?;

    let filtered = validate_records(&df, &known(None), today())?;
    assert_eq!(companies(&filtered), vec!["numeric_text", "integer"]);
    Ok(())
}

#[test]
fn boolean_values_are_not_valuations() -> Result<()> {
    let df = payload_to_frame(&json!([
        row("flag", json!("2023-06-01"), json!(true), json!("USD")),
    ]))?;

    let filtered = validate_records(&df, &known(None), today())?;
    assert_eq!(filtered.height(), 0);
    Ok(())
}

#[test]
fn reference_currency_is_accepted_only_when_configured() -> Result<()> {
    let df = payload_to_frame(&json!([
        row("sek", json!("2023-06-01"), json!(1), json!("SEK")),
        row("usd", json!("2023-06-01"), json!(1), json!("USD")),
        row("null", json!("2023-06-01"), json!(1), Value::Null),
    ]))?;

    let strict = validate_records(&df, &known(None), today())?;
    assert_eq!(companies(&strict), vec!["usd"]);

    let with_reference = validate_records(&df, &known(Some("SEK")), today())?;
    assert_eq!(companies(&with_reference), vec!["sek", "usd"]);
    Ok(())
}

#[test]
fn output_is_an_ordered_subset_of_input() -> Result<()> {
    let df = df!(
        "company" => &["c1", "c2", "c3", "c4", "c5"],
        "timestamp" => &["2020-01-31", "2099-01-01", "2021-12-31", "2022-05-05", "2019-07-04"],
        "value" => &[1.0f64, 2.0, -3.0, 4.0, 5.0],
        "currency" => &["USD", "USD", "EUR", "EUR", "GBP"],
    )?;

    let filtered = validate_records(&df, &known(None), today())?;

    assert!(filtered.height() <= df.height());
    assert_eq!(companies(&filtered), vec!["c1", "c4"]);
    assert_eq!(filtered.get_column_names(), df.get_column_names());
    Ok(())
}

#[test]
fn empty_batches_pass_through() -> Result<()> {
    let df = payload_to_frame(&json!([]))?;
    let filtered = validate_records(&df, &known(None), today())?;
    assert_eq!(filtered.height(), 0);
    Ok(())
}

#[test]
fn missing_required_column_is_an_error() -> Result<()> {
    let df = df!(
        "company" => &["a"],
        "timestamp" => &["2023-06-01"],
        "value" => &[1.0f64],
    )?;

    let err = validate_records(&df, &known(None), today()).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn("currency")));
    Ok(())
}
