//! Order execution sink.
//!
//! The trading pipeline hands its decision here when execution is enabled.
//! The default implementation is paper-only: it records what would have been
//! submitted and returns a synthetic order id.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::Market;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionSink: Send + Sync {
    /// Submit a market order for `amount` USD against the given market.
    /// Returns an order identifier.
    async fn execute_market_order(&self, market: &Market, amount: Decimal) -> Result<String>;
}

#[derive(Debug, Default, Clone)]
pub struct PaperExecutor;

impl PaperExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionSink for PaperExecutor {
    async fn execute_market_order(&self, market: &Market, amount: Decimal) -> Result<String> {
        let question = market.question.as_deref().unwrap_or("<unknown market>");
        let order_id = format!(
            "paper-{}",
            market.id.as_deref().unwrap_or("unidentified")
        );
        info!("[PAPER] Would submit market order: {amount} USD on '{question}' ({order_id})");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[tokio::test]
    async fn paper_executor_returns_synthetic_order_id() {
        let market: Market =
            serde_json::from_value(json!({"id": "42", "question": "Will it?"})).unwrap();
        let order_id = PaperExecutor::new()
            .execute_market_order(&market, dec!(5))
            .await
            .unwrap();
        assert_eq!(order_id, "paper-42");
    }
}
