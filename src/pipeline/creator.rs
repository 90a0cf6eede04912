//! Market-creation pipeline.
//!
//! Same shape as the trading pipeline, but the decision ranks the full
//! filtered set and yields a description of the best new market to create.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::coerce_items;
use crate::adapters::MarketFeed;
use crate::agent::ReasoningAgent;
use crate::config::PipelineConfig;
use crate::domain::{Event, Market};
use crate::error::Result;
use crate::persistence::{HistoryLog, MarketCreationRecord};

const OPERATION: &str = "one_best_market";

pub struct Creator {
    feed: Arc<dyn MarketFeed>,
    agent: Arc<dyn ReasoningAgent>,
    history: Arc<HistoryLog>,
    pipeline: PipelineConfig,
}

impl Creator {
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        agent: Arc<dyn ReasoningAgent>,
        history: Arc<HistoryLog>,
        pipeline: PipelineConfig,
    ) -> Self {
        Self {
            feed,
            agent,
            history,
            pipeline,
        }
    }

    /// Run the pipeline until it yields a market idea or a terminal empty
    /// outcome. Returns `None` when no candidates survive filtering or the
    /// attempt budget runs out; the audit trail records why.
    pub async fn one_best_market(&self) -> Result<Option<String>> {
        for attempt in 1..=self.pipeline.max_attempts {
            match self.attempt().await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    let error_msg = e.to_string();
                    error!("Error in {OPERATION} (attempt {attempt}): {error_msg}");
                    self.history
                        .log_market_creation(MarketCreationRecord {
                            success: false,
                            error: Some(error_msg),
                            ..Default::default()
                        })
                        .await;

                    if attempt < self.pipeline.max_attempts {
                        let delay = self.pipeline.backoff(attempt);
                        info!("Retrying in {delay:?}...");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(
            "{OPERATION} gave up after {} attempts",
            self.pipeline.max_attempts
        );
        Ok(None)
    }

    async fn attempt(&self) -> Result<Option<String>> {
        let events = self.feed.get_all_tradeable_events().await?;
        let events_count = events.len() as u64;
        info!("1. FOUND {events_count} EVENTS");

        let filtered_events: Vec<Event> =
            coerce_items(self.agent.filter_events_by_relevance(&events).await?);
        let filtered_events_count = filtered_events.len() as u64;
        info!("2. FILTERED {filtered_events_count} EVENTS");

        let markets = self.agent.map_events_to_markets(&filtered_events).await?;
        let markets_count = markets.len() as u64;
        info!("3. FOUND {markets_count} MARKETS");

        let filtered_markets: Vec<Market> =
            coerce_items(self.agent.filter_markets_by_quality(&markets).await?);
        let filtered_markets_count = filtered_markets.len() as u64;
        info!("4. FILTERED {filtered_markets_count} MARKETS");

        if filtered_markets.is_empty() {
            warn!("No markets found after filtering");
            self.history
                .log_market_creation(MarketCreationRecord {
                    events_count: Some(events_count),
                    markets_count: Some(markets_count),
                    filtered_events_count: Some(filtered_events_count),
                    filtered_markets_count: Some(filtered_markets_count),
                    success: false,
                    error: Some("No markets found after filtering".to_string()),
                    ..Default::default()
                })
                .await;
            return Ok(None);
        }

        let best_market = self
            .agent
            .select_best_market_idea(&filtered_markets)
            .await?;
        info!("5. IDEA FOR NEW MARKET {best_market}");

        self.history
            .log_market_creation(MarketCreationRecord {
                market_description: Some(best_market.clone()),
                events_count: Some(events_count),
                markets_count: Some(markets_count),
                filtered_events_count: Some(filtered_events_count),
                filtered_markets_count: Some(filtered_markets_count),
                success: true,
                ..Default::default()
            })
            .await;

        Ok(Some(best_market))
    }
}
