//! Tick classification
//!
//! Only `type` and `instrument` are inspected before a record is classified;
//! the remaining PRICE fields are decoded afterwards and any shape mismatch
//! turns the record into `Unknown` instead of an error.

use serde_json::Value;

use crate::stream::messages::{Heartbeat, StreamRecord, WirePrice, HEARTBEAT, PRICE};

/// Classify one decoded stream value. Total over all JSON values.
pub fn classify(value: Value) -> StreamRecord {
    let kind = value.get("type").and_then(Value::as_str);

    match kind {
        Some(HEARTBEAT) => {
            let time = value
                .get("time")
                .and_then(Value::as_str)
                .unwrap_or_default();
            StreamRecord::Heartbeat(Heartbeat::new(time))
        }
        Some(PRICE) => {
            let has_instrument = value
                .get("instrument")
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !has_instrument {
                return StreamRecord::unknown(Some(PRICE), "price record without instrument");
            }
            match serde_json::from_value::<WirePrice>(value) {
                Ok(wire) => match wire.into_quote() {
                    Ok(quote) => StreamRecord::Quote(quote),
                    Err(reason) => StreamRecord::unknown(Some(PRICE), reason),
                },
                Err(e) => StreamRecord::unknown(Some(PRICE), format!("malformed price record: {}", e)),
            }
        }
        Some(other) => StreamRecord::unknown(Some(other), "unrecognised record type"),
        None => StreamRecord::unknown(None, "record has no string type field"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::messages::Quote;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    fn price_json() -> Value {
        json!({
            "type": "PRICE",
            "time": "2024-01-01T00:00:00.123456789Z",
            "bids": [
                {"price": "1.35012", "liquidity": 1000000},
                {"price": "1.35010", "liquidity": 5000000}
            ],
            "asks": [
                {"price": "1.35030", "liquidity": 1000000},
                {"price": "1.35032", "liquidity": 5000000}
            ],
            "closeoutBid": "1.34997",
            "closeoutAsk": "1.35045",
            "status": "tradeable",
            "tradeable": true,
            "instrument": "USD_CAD"
        })
    }

    fn expect_quote(record: StreamRecord) -> Quote {
        match record {
            StreamRecord::Quote(q) => q,
            other => panic!("expected Quote, got {:?}", other),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_heartbeat() {
        let record = classify(json!({"type": "HEARTBEAT", "time": "2024-01-01T00:00:00Z"}));
        assert_eq!(
            record,
            StreamRecord::Heartbeat(Heartbeat::new("2024-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_heartbeat_ignores_other_fields() {
        let samples = [
            json!({"type": "HEARTBEAT", "time": "t", "instrument": "USD_CAD"}),
            json!({"type": "HEARTBEAT", "bids": "not a list", "tradeable": "maybe"}),
            json!({"type": "HEARTBEAT", "time": 12345}),
            json!({"type": "HEARTBEAT"}),
        ];
        for sample in samples {
            assert!(
                matches!(classify(sample.clone()), StreamRecord::Heartbeat(_)),
                "not a heartbeat: {}",
                sample
            );
        }
    }

    #[test]
    fn test_price_preserves_fields() {
        let quote = expect_quote(classify(price_json()));

        assert_eq!(quote.instrument, "USD_CAD");
        assert_eq!(quote.time, "2024-01-01T00:00:00.123456789Z");
        assert_eq!(quote.bid.price, dec("1.35012"));
        assert_eq!(quote.bid.liquidity, 1_000_000);
        assert_eq!(quote.ask.price, dec("1.35030"));
        assert_eq!(quote.ask.liquidity, 1_000_000);
        assert_eq!(quote.closeout_bid, Some(dec("1.34997")));
        assert_eq!(quote.closeout_ask, Some(dec("1.35045")));
        assert_eq!(quote.status, "tradeable");
        assert!(quote.tradeable);
    }

    #[test]
    fn test_price_reencode_matches_input() {
        let input = price_json();
        let quote = expect_quote(classify(input.clone()));
        let output = serde_json::to_value(&quote).unwrap();

        for key in ["type", "time", "instrument", "status", "tradeable"] {
            assert_eq!(output[key], input[key], "field {}", key);
        }
        for side in ["bids", "asks"] {
            assert_eq!(output[side][0]["liquidity"], input[side][0]["liquidity"]);
            let out: Decimal = serde_json::from_value(output[side][0]["price"].clone()).unwrap();
            let inp: Decimal = serde_json::from_value(input[side][0]["price"].clone()).unwrap();
            assert_eq!(out, inp);
        }
        for key in ["closeoutBid", "closeoutAsk"] {
            let out: Decimal = serde_json::from_value(output[key].clone()).unwrap();
            let inp: Decimal = serde_json::from_value(input[key].clone()).unwrap();
            assert_eq!(out, inp);
        }
    }

    #[test]
    fn test_numeric_prices_accepted() {
        let mut value = price_json();
        value["bids"][0]["price"] = json!(1.5);
        value["closeoutBid"] = json!(2);

        let quote = expect_quote(classify(value));
        assert_eq!(quote.bid.price, dec("1.5"));
        assert_eq!(quote.closeout_bid, Some(dec("2")));
    }

    #[test]
    fn test_lowercase_closeout_keys_accepted() {
        let mut value = price_json();
        let obj = value.as_object_mut().unwrap();
        obj.remove("closeoutBid");
        obj.remove("closeoutAsk");
        obj.insert("closeoutbid".into(), json!("1.1"));
        obj.insert("closeoutask".into(), json!("1.2"));

        let quote = expect_quote(classify(value));
        assert_eq!(quote.closeout_bid, Some(dec("1.1")));
        assert_eq!(quote.closeout_ask, Some(dec("1.2")));
    }

    #[test]
    fn test_optional_fields_default() {
        let value = json!({
            "type": "PRICE",
            "time": "2024-01-01T00:00:00Z",
            "bids": [{"price": "1.0", "liquidity": 10}],
            "asks": [{"price": "1.1", "liquidity": 10}],
            "instrument": "EUR_USD"
        });
        let quote = expect_quote(classify(value));
        assert_eq!(quote.closeout_bid, None);
        assert_eq!(quote.status, "");
        assert!(!quote.tradeable);
    }

    #[test]
    fn test_price_without_instrument_is_unknown() {
        let mut empty = price_json();
        empty["instrument"] = json!("");
        let mut missing = price_json();
        missing.as_object_mut().unwrap().remove("instrument");
        let mut numeric = price_json();
        numeric["instrument"] = json!(7);

        for value in [empty, missing, numeric] {
            match classify(value) {
                StreamRecord::Unknown(u) => assert_eq!(u.kind.as_deref(), Some("PRICE")),
                other => panic!("expected Unknown, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_malformed_price_is_unknown() {
        let mut no_bids = price_json();
        no_bids["bids"] = json!([]);
        let mut bad_price = price_json();
        bad_price["asks"][0]["price"] = json!("one point three");
        let mut no_time = price_json();
        no_time.as_object_mut().unwrap().remove("time");

        for value in [no_bids, bad_price, no_time] {
            assert!(matches!(classify(value), StreamRecord::Unknown(_)));
        }
    }

    #[test]
    fn test_other_values_are_unknown() {
        let samples = [
            json!({"type": "HOME_CONVERSION", "instrument": "USD_CAD"}),
            json!({"type": "price", "instrument": "USD_CAD"}),
            json!({"instrument": "USD_CAD"}),
            json!({"type": 1}),
            json!({}),
            json!([1, 2, 3]),
            json!("PRICE"),
            json!(null),
            json!(42),
        ];
        for sample in samples {
            assert!(
                matches!(classify(sample.clone()), StreamRecord::Unknown(_)),
                "classified: {}",
                sample
            );
        }
    }

    #[test]
    fn test_unknown_keeps_type_for_logging() {
        match classify(json!({"type": "HOME_CONVERSION"})) {
            StreamRecord::Unknown(u) => {
                assert_eq!(u.kind.as_deref(), Some("HOME_CONVERSION"));
                assert_eq!(u.reason, "unrecognised record type");
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }
}
