//! Exchange Adapters - Per-Exchange Wire Protocol Strategies
//!
//! One module per exchange, each implementing `ExchangeAdapter` with
//! that venue's framing, compression, vocabulary, subscription
//! granularity, and keepalive contract:
//! - Huobi: gzip binary frames, app-layer ping/pong, per-pair subscribe
//! - Binance: plain text, subscription set in the stream URL
//! - Coinbase: plain text, one batched subscribe, heartbeat channel

pub mod binance;
pub mod coinbase;
pub mod huobi;

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::error::{ConfigError, DecodeError};
use crate::domain::symbols::PairMap;
use crate::ports::exchange::ExchangeAdapter;

pub use binance::BinanceAdapter;
pub use coinbase::CoinbaseAdapter;
pub use huobi::HuobiAdapter;

/// Build the adapter for a configured exchange id.
pub fn build(exchange: &str, pairs: PairMap) -> Result<Arc<dyn ExchangeAdapter>, ConfigError> {
    match exchange {
        "huobi" => Ok(Arc::new(HuobiAdapter::new(pairs)?)),
        "binance" => Ok(Arc::new(BinanceAdapter::new(pairs)?)),
        "coinbase" => Ok(Arc::new(CoinbaseAdapter::new(pairs)?)),
        other => Err(ConfigError::Invalid(format!("unknown exchange: {other}"))),
    }
}

/// Exchange ids this build knows how to drive.
pub const SUPPORTED: &[&str] = &["huobi", "binance", "coinbase"];

// ── Wire field helpers shared by all adapters ───────────────
//
// Exchanges report monetary values as JSON strings or numbers.
// Either way the exact digits are preserved: strings go straight
// to Decimal, numbers keep their original text thanks to
// serde_json's arbitrary_precision feature.

pub(crate) fn decimal_value(raw: &Value, field: &str) -> Result<Decimal, DecodeError> {
    let text = match raw {
        Value::String(s) => s.as_str().to_string(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(DecodeError::Decimal {
                field: field.to_string(),
                value: raw.to_string(),
            })
        }
    };
    Decimal::from_str(&text).map_err(|_| DecodeError::Decimal {
        field: field.to_string(),
        value: text,
    })
}

pub(crate) fn decimal_field(msg: &Value, field: &str) -> Result<Decimal, DecodeError> {
    let raw = msg
        .get(field)
        .ok_or_else(|| DecodeError::Field(field.to_string()))?;
    decimal_value(raw, field)
}

pub(crate) fn str_field<'a>(msg: &'a Value, field: &str) -> Result<&'a str, DecodeError> {
    msg.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Field(field.to_string()))
}

pub(crate) fn u64_field(msg: &Value, field: &str) -> Result<u64, DecodeError> {
    msg.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| DecodeError::Field(field.to_string()))
}

/// Parse `[[price, size], ...]` book levels, skipping malformed ones.
pub(crate) fn book_levels(raw: Option<&Value>) -> Vec<crate::domain::event::BookLevel> {
    raw.and_then(Value::as_array)
        .map(|levels| {
            levels
                .iter()
                .filter_map(|level| {
                    let entries = level.as_array()?;
                    let price = decimal_value(entries.first()?, "price").ok()?;
                    let size = decimal_value(entries.get(1)?, "size").ok()?;
                    Some((price, size))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Exchange-reported RFC 3339 time → Unix milliseconds.
pub(crate) fn rfc3339_ms(msg: &Value, field: &str) -> Result<u64, DecodeError> {
    let raw = str_field(msg, field)?;
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .map_err(|e| DecodeError::Field(format!("{field}: {e}")))?;
    u64::try_from(parsed.timestamp_millis())
        .map_err(|_| DecodeError::Field(format!("{field}: pre-epoch timestamp")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_field_from_string() {
        let msg = json!({"price": "3669.69"});
        assert_eq!(decimal_field(&msg, "price").unwrap().to_string(), "3669.69");
    }

    #[test]
    fn test_decimal_field_from_number_keeps_digits() {
        // arbitrary_precision keeps 0.0777 textually exact
        let msg: Value = serde_json::from_str(r#"{"amount": 0.0777}"#).unwrap();
        assert_eq!(decimal_field(&msg, "amount").unwrap().to_string(), "0.0777");
    }

    #[test]
    fn test_decimal_field_missing() {
        let msg = json!({});
        assert!(matches!(
            decimal_field(&msg, "price"),
            Err(DecodeError::Field(_))
        ));
    }

    #[test]
    fn test_rfc3339_ms() {
        let msg = json!({"time": "2019-02-10T00:45:27.140Z"});
        assert_eq!(rfc3339_ms(&msg, "time").unwrap(), 1_549_759_527_140);
    }
}
