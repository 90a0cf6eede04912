//! The reasoning service's answer for the trading pipeline.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A parsed trade decision. The reasoning service replies in loose JSON, so
/// every field is optional and the raw text is kept for the audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeDecision {
    #[serde(default)]
    pub market_id: Option<String>,
    /// "yes" / "no" (outcome to buy)
    #[serde(default)]
    pub side: Option<String>,
    /// Position size in USD
    #[serde(default)]
    pub size_usd: Option<Decimal>,
    #[serde(default)]
    pub rationale: Option<String>,
    /// Verbatim reasoning-service output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl TradeDecision {
    /// Order size, defaulting to the minimum stake when the service gave none.
    pub fn amount(&self) -> Decimal {
        self.size_usd.unwrap_or(dec!(1))
    }

    /// One-line description used in audit records and progress logs.
    pub fn summary(&self) -> String {
        let side = self.side.as_deref().unwrap_or("yes");
        match &self.rationale {
            Some(rationale) => format!("{side} {} USD: {rationale}", self.amount()),
            None => format!("{side} {} USD", self.amount()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_defaults_to_minimum_stake() {
        let decision = TradeDecision::default();
        assert_eq!(decision.amount(), dec!(1));
    }

    #[test]
    fn parses_partial_json() {
        let decision: TradeDecision =
            serde_json::from_str(r#"{"side": "no", "size_usd": 2.5}"#).unwrap();
        assert_eq!(decision.side.as_deref(), Some("no"));
        assert_eq!(decision.amount(), dec!(2.5));
        assert!(decision.summary().starts_with("no 2.5 USD"));
    }
}
