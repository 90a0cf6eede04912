//! Reasoning service: the black box that filters, ranks and selects.

pub mod client;

pub use client::LlmGatewayClient;

use crate::domain::{Event, Market, TradeDecision};
use crate::error::Result;
use async_trait::async_trait;

/// The reasoning/ranking collaborator consumed by the pipelines.
///
/// The two `filter_*` calls return raw JSON: the service is expected to
/// answer with an array, but callers must coerce anything else to an empty
/// collection instead of raising a type error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    /// Narrow events to the ones worth trading, as a JSON array of events.
    async fn filter_events_by_relevance(&self, events: &[Event]) -> Result<serde_json::Value>;

    /// Expand filtered events into their tradeable markets.
    async fn map_events_to_markets(&self, events: &[Event]) -> Result<Vec<Market>>;

    /// Narrow markets on quality, as a JSON array of markets.
    async fn filter_markets_by_quality(&self, markets: &[Market]) -> Result<serde_json::Value>;

    /// Pick the best trade on a single market.
    async fn select_best_trade(&self, market: &Market) -> Result<TradeDecision>;

    /// Propose the best new market to create, given the surviving candidates.
    async fn select_best_market_idea(&self, markets: &[Market]) -> Result<String>;

    /// Free-form question.
    async fn ask(&self, question: &str) -> Result<String>;

    /// Free-form question answered with market context.
    async fn ask_with_markets(&self, question: &str, markets: &[Market]) -> Result<String>;

    /// Forecast a single outcome of a market question.
    async fn superforecast(
        &self,
        event_title: &str,
        market_question: &str,
        outcome: &str,
    ) -> Result<String>;
}
