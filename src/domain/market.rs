//! Event and market records sourced from the upstream feed.
//!
//! The pipelines treat these as opaque beyond counting, filtering and
//! first-element selection, so both types keep serde permissive: every field
//! beyond `id` is optional and unknown upstream fields are preserved in
//! `extra` so audit payloads survive round-trips.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// An event from the Gamma API, embedding its markets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "de_string_opt")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default, deserialize_with = "de_decimal_opt")]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Event {
    /// True when the event is currently open for trading.
    pub fn is_tradeable(&self) -> bool {
        self.active && !self.closed
    }
}

/// A single market (question) inside an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    #[serde(default, deserialize_with = "de_string_opt")]
    pub id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default, deserialize_with = "de_decimal_opt")]
    pub spread: Option<Decimal>,
    #[serde(default, rename = "volume24hr", deserialize_with = "de_decimal_opt")]
    pub volume_24hr: Option<Decimal>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Market {
    pub fn is_tradeable(&self) -> bool {
        self.active && !self.closed
    }
}

/// Gamma serves ids both as JSON strings and as numbers.
fn de_string_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Numeric fields arrive as strings, numbers, or not at all.
fn de_decimal_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
        Some(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_parses_with_numeric_id_and_string_volume() {
        let json = r#"{
            "id": 12345,
            "title": "Presidential Election",
            "active": true,
            "closed": false,
            "volume": "1500.25",
            "markets": [{"id": "900", "question": "Will X win?", "active": true}],
            "category": "politics"
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.id.as_deref(), Some("12345"));
        assert_eq!(event.volume, Some(dec!(1500.25)));
        assert_eq!(event.markets.len(), 1);
        assert!(event.is_tradeable());
        // Unknown fields survive
        assert!(event.extra.contains_key("category"));
    }

    #[test]
    fn market_tolerates_missing_fields() {
        let market: Market = serde_json::from_str(r#"{"question": "Will it rain?"}"#).unwrap();
        assert!(market.id.is_none());
        assert!(!market.is_tradeable());
        assert!(market.spread.is_none());
    }

    #[test]
    fn market_round_trips_through_json() {
        let json = r#"{"id": "7", "question": "Q", "volume24hr": 42.5, "liquidity": "10"}"#;
        let market: Market = serde_json::from_str(json).unwrap();
        assert_eq!(market.volume_24hr, Some(dec!(42.5)));

        let value = serde_json::to_value(&market).unwrap();
        assert_eq!(value["liquidity"], serde_json::json!("10"));
    }
}
