//! Normalization of raw Polymarket JSON records
//!
//! Field names follow the Polymarket Data API (positions, trades) and the
//! Gamma API (markets). Numeric fields are accepted both as JSON numbers and
//! as numeric strings, since the two APIs are not consistent about it.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::MappingError;
use crate::models::{Market, Outcome, Position, Trade, TradeSide};

type Record = Map<String, Value>;

const UNKNOWN_MARKET: &str = "Unknown Market";

/// Timestamps above this are treated as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Map a Data API `/positions` record.
pub fn position_from_value(value: &Value) -> Result<Position, MappingError> {
    let record = value.as_object().ok_or(MappingError::NotAnObject)?;

    let market_id = required_str(record, "conditionId")?;
    let outcome = Outcome::parse(&required_str(record, "outcome")?);
    let size = required_number(record, "size")?;
    let avg_price = required_number(record, "avgPrice")?;

    let reported_value = optional_number(record, "currentValue")?;
    let current_price = match optional_number(record, "curPrice")? {
        Some(price) => price,
        None => match reported_value {
            Some(v) if size > 0.0 => v / size,
            _ => avg_price,
        },
    };
    let current_value = reported_value.unwrap_or(size * current_price);
    let initial_value = optional_number(record, "initialValue")?.unwrap_or(size * avg_price);

    let pnl = optional_number(record, "cashPnl")?.unwrap_or(current_value - initial_value);
    let percent_pnl = match optional_number(record, "percentPnl")? {
        Some(pct) => pct,
        None if initial_value > 0.0 => pnl / initial_value * 100.0,
        None => 0.0,
    };

    Ok(Position {
        market_id,
        asset: optional_str(record, "asset").unwrap_or_default(),
        title: optional_str(record, "title").unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        outcome,
        size,
        avg_price,
        current_price,
        current_value,
        pnl,
        percent_pnl,
        redeemable: record.get("redeemable").and_then(Value::as_bool).unwrap_or(false),
        mergeable: record.get("mergeable").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Map a Data API `/trades` record. `pnl` is left at zero; it is assigned
/// once the whole history is known.
pub fn trade_from_value(value: &Value) -> Result<Trade, MappingError> {
    let record = value.as_object().ok_or(MappingError::NotAnObject)?;

    let raw_side = required_str(record, "side")?;
    let side = if raw_side.eq_ignore_ascii_case("buy") {
        TradeSide::Buy
    } else if raw_side.eq_ignore_ascii_case("sell") {
        TradeSide::Sell
    } else {
        return Err(MappingError::Invalid {
            field: "side",
            value: raw_side,
        });
    };

    let size = required_number(record, "size")?;
    let price = required_number(record, "price")?;
    let timestamp = parse_timestamp(
        record
            .get("timestamp")
            .filter(|v| !v.is_null())
            .ok_or(MappingError::MissingField("timestamp"))?,
    )?;

    let asset = optional_str(record, "asset").unwrap_or_default();
    let id = optional_str(record, "transactionHash")
        .or_else(|| optional_str(record, "id"))
        .unwrap_or_else(|| format!("{}:{}", asset, timestamp.timestamp()));

    Ok(Trade {
        id,
        asset,
        market_id: optional_str(record, "conditionId").unwrap_or_default(),
        title: optional_str(record, "title").unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        side,
        size,
        price,
        volume: size * price,
        timestamp,
        pnl: 0.0,
    })
}

/// Map a Gamma API `/markets` record. Prices are converted to cents.
pub fn market_from_value(value: &Value) -> Result<Market, MappingError> {
    let record = value.as_object().ok_or(MappingError::NotAnObject)?;

    let id = match record.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(MappingError::MissingField("id")),
    };
    let question = required_str(record, "question")?;
    let (yes, no) = outcome_prices(record)?;

    let end_date = ["endDate", "endDateIso", "end_date_iso"]
        .iter()
        .find_map(|key| optional_str(record, key))
        .and_then(|raw| parse_date(&raw));

    Ok(Market {
        id,
        question,
        description: optional_str(record, "description"),
        slug: optional_str(record, "slug"),
        volume_24h: optional_number(record, "volume24hr")?.unwrap_or(0.0),
        yes_price: yes * 100.0,
        no_price: no * 100.0,
        end_date,
        category: optional_str(record, "category"),
        image: optional_str(record, "image"),
    })
}

/// YES/NO probabilities from `outcomePrices` (a JSON-encoded string array on
/// Gamma) or from the older `tokens[].price` shape.
fn outcome_prices(record: &Record) -> Result<(f64, f64), MappingError> {
    let prices: Vec<Value> = match record.get("outcomePrices") {
        Some(Value::String(encoded)) => {
            serde_json::from_str(encoded).map_err(|_| MappingError::Invalid {
                field: "outcomePrices",
                value: encoded.clone(),
            })?
        }
        Some(Value::Array(items)) => items.clone(),
        _ => record
            .get("tokens")
            .and_then(Value::as_array)
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|t| t.get("price").cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .unwrap_or_default(),
    };

    let price_at = |index: usize| -> Result<f64, MappingError> {
        match prices.get(index) {
            None | Some(Value::Null) => Ok(0.0),
            Some(v) => as_number(v).ok_or_else(|| MappingError::NotNumeric {
                field: "outcomePrices",
                value: v.to_string(),
            }),
        }
    };

    Ok((price_at(0)?, price_at(1)?))
}

// =============================================================================
// Field helpers
// =============================================================================

fn as_number(value: &Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|n| n.is_finite())
}

fn optional_number(record: &Record, field: &'static str) -> Result<Option<f64>, MappingError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => as_number(v).map(Some).ok_or_else(|| MappingError::NotNumeric {
            field,
            value: v.to_string(),
        }),
    }
}

fn required_number(record: &Record, field: &'static str) -> Result<f64, MappingError> {
    optional_number(record, field)?.ok_or(MappingError::MissingField(field))
}

fn optional_str(record: &Record, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn required_str(record: &Record, field: &'static str) -> Result<String, MappingError> {
    optional_str(record, field).ok_or(MappingError::MissingField(field))
}

/// Unix seconds, unix milliseconds (number or string) or RFC 3339.
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, MappingError> {
    let invalid = || MappingError::Invalid {
        field: "timestamp",
        value: value.to_string(),
    };

    if let Some(n) = as_number(value) {
        let millis = if n.abs() >= MILLIS_THRESHOLD { n } else { n * 1000.0 };
        return Utc
            .timestamp_millis_opt(millis as i64)
            .single()
            .ok_or_else(invalid);
    }

    value.as_str().and_then(parse_date).ok_or_else(invalid)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_from_data_api_record() {
        let raw = json!({
            "proxyWallet": "0x742d35cc6634c0532925a3b8d4c9db96590c6c87",
            "asset": "71321045679252212594626385532706912750332728571942532289631379312455583992563",
            "conditionId": "0xe3b423dfad8c22ff75c9899c4e8176f628cf4ad4caa00481764d320e7415f7a9",
            "size": 120.5,
            "avgPrice": 0.42,
            "initialValue": 50.61,
            "currentValue": 72.3,
            "cashPnl": 21.69,
            "percentPnl": 42.86,
            "curPrice": 0.6,
            "redeemable": false,
            "mergeable": true,
            "title": "Will ETH reach $5,000 in 2026?",
            "outcome": "Yes",
            "outcomeIndex": 0
        });

        let position = position_from_value(&raw).unwrap();
        assert_eq!(position.outcome, Outcome::Yes);
        assert_eq!(position.size, 120.5);
        assert_eq!(position.current_price, 0.6);
        assert_eq!(position.pnl, 21.69);
        assert_eq!(position.percent_pnl, 42.86);
        assert!(position.mergeable);
        assert!(!position.redeemable);
        assert_eq!(position.title, "Will ETH reach $5,000 in 2026?");
    }

    #[test]
    fn test_position_numeric_strings_and_derived_fields() {
        let raw = json!({
            "conditionId": "0xabc",
            "outcome": "Trump",
            "size": "100",
            "avgPrice": "0.25",
            "currentValue": "40"
        });

        let position = position_from_value(&raw).unwrap();
        assert_eq!(position.outcome, Outcome::Other("Trump".to_string()));
        assert_eq!(position.title, "Unknown Market");
        assert!((position.current_price - 0.4).abs() < 1e-9);
        assert!((position.pnl - 15.0).abs() < 1e-9);
        assert!((position.percent_pnl - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_mapping_failures() {
        assert_eq!(
            position_from_value(&json!("not a record")),
            Err(MappingError::NotAnObject)
        );
        assert_eq!(
            position_from_value(&json!({"conditionId": "0xabc", "outcome": "Yes", "avgPrice": 0.5})),
            Err(MappingError::MissingField("size"))
        );
        assert!(matches!(
            position_from_value(&json!({
                "conditionId": "0xabc", "outcome": "Yes", "size": "lots", "avgPrice": 0.5
            })),
            Err(MappingError::NotNumeric { field: "size", .. })
        ));
    }

    #[test]
    fn test_trade_timestamps() {
        let seconds = trade_from_value(&json!({
            "side": "BUY", "size": 10, "price": 0.5, "timestamp": 1_700_000_000
        }))
        .unwrap();
        let millis = trade_from_value(&json!({
            "side": "buy", "size": 10, "price": 0.5, "timestamp": "1700000000000"
        }))
        .unwrap();
        let rfc = trade_from_value(&json!({
            "side": "Sell", "size": 10, "price": 0.5, "timestamp": "2023-11-14T22:13:20Z"
        }))
        .unwrap();

        assert_eq!(seconds.timestamp, millis.timestamp);
        assert_eq!(seconds.timestamp, rfc.timestamp);
        assert_eq!(rfc.side, TradeSide::Sell);
        assert_eq!(seconds.volume, 5.0);
        assert_eq!(seconds.id, ":1700000000");
    }

    #[test]
    fn test_trade_rejects_unknown_side() {
        assert!(matches!(
            trade_from_value(&json!({"side": "HOLD", "size": 1, "price": 1, "timestamp": 1})),
            Err(MappingError::Invalid { field: "side", .. })
        ));
        assert_eq!(
            trade_from_value(&json!({"side": "BUY", "size": 1, "price": 1})),
            Err(MappingError::MissingField("timestamp"))
        );
    }

    #[test]
    fn test_market_prices_in_cents() {
        let gamma = json!({
            "id": "253591",
            "question": "Fed rate cut in December?",
            "volume24hr": 125000.5,
            "outcomePrices": "[\"0.655\", \"0.345\"]",
            "endDate": "2026-12-10T12:00:00Z",
            "category": "Economics"
        });
        let market = market_from_value(&gamma).unwrap();
        assert!((market.yes_price - 65.5).abs() < 1e-9);
        assert!((market.no_price - 34.5).abs() < 1e-9);
        assert_eq!(market.volume_24h, 125000.5);
        assert!(market.end_date.is_some());

        let tokens = json!({
            "id": 7,
            "question": "Old shape",
            "tokens": [{"price": 0.2}, {"price": "0.8"}]
        });
        let market = market_from_value(&tokens).unwrap();
        assert_eq!(market.id, "7");
        assert!((market.yes_price - 20.0).abs() < 1e-9);
        assert!((market.no_price - 80.0).abs() < 1e-9);
        assert_eq!(market.volume_24h, 0.0);
    }

    #[test]
    fn test_market_requires_question() {
        assert_eq!(
            market_from_value(&json!({"id": "1"})),
            Err(MappingError::MissingField("question"))
        );
    }
}
