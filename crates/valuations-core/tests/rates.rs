use serde_json::json;
use valuations_core::ingestion::payload_to_frame;
use valuations_core::model::ExchangeRate;
use valuations_core::rates::{KnownCurrencies, RateTable, RateTableError};

fn table(payload: serde_json::Value) -> Result<RateTable, RateTableError> {
    let df = payload_to_frame(&payload).expect("ingest rates");
    RateTable::from_frame(&df)
}

#[test]
fn loads_rates_and_looks_them_up() {
    let rates = table(json!([
        {"from_currency": "USD", "to_currency": "SEK", "rate": 10},
        {"from_currency": "EUR", "to_currency": "SEK", "rate": 11.5},
    ]))
    .expect("valid table");

    assert_eq!(rates.len(), 2);
    let usd = rates.lookup("USD").expect("USD rate");
    assert_eq!(usd.to_currency, "SEK");
    assert_eq!(usd.rate, 10.0);
    assert!(rates.lookup("SEK").is_none());
    assert_eq!(rates.source_currencies().collect::<Vec<_>>(), vec!["USD", "EUR"]);
}

#[test]
fn duplicate_source_currency_is_rejected() {
    let err = table(json!([
        {"from_currency": "USD", "to_currency": "SEK", "rate": 10},
        {"from_currency": "USD", "to_currency": "SEK", "rate": 9},
    ]))
    .unwrap_err();

    assert!(matches!(err, RateTableError::DuplicateSource(code) if code == "USD"));
}

#[test]
fn non_positive_or_missing_rates_are_rejected() {
    for rate in [json!(0), json!(-1.5), json!(null), json!("abc")] {
        let result = table(json!([{"from_currency": "USD", "to_currency": "SEK", "rate": rate}]));
        assert!(
            matches!(result, Err(RateTableError::InvalidRate { .. })),
            "rate {rate} should be rejected"
        );
    }
}

#[test]
fn missing_columns_and_codes_are_reported() {
    let err = table(json!([{"from_currency": "USD", "rate": 10}])).unwrap_err();
    assert!(matches!(err, RateTableError::MissingColumn("to_currency")));

    let err = table(json!([
        {"from_currency": "USD", "to_currency": "SEK", "rate": 10},
        {"from_currency": null, "to_currency": "SEK", "rate": 10},
    ]))
    .unwrap_err();
    assert!(matches!(
        err,
        RateTableError::MissingCode { row: 1, column: "from_currency" }
    ));
}

#[test]
fn empty_payload_is_an_empty_table() {
    let rates = table(json!([])).expect("empty table");
    assert!(rates.is_empty());
}

#[test]
fn known_currencies_include_reference_only_when_configured() {
    let rates = RateTable::from_rates(vec![ExchangeRate {
        from_currency: "USD".into(),
        to_currency: "SEK".into(),
        rate: 10.0,
    }])
    .expect("valid table");

    let without = KnownCurrencies::new(&rates, None);
    assert!(without.contains("USD"));
    assert!(!without.contains("SEK"));

    let with = KnownCurrencies::new(&rates, Some("SEK"));
    assert!(with.contains("SEK"));
    assert_eq!(with.len(), 2);
}
