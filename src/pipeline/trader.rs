//! Trade-selection pipeline.
//!
//! `one_best_trade` evaluates all tradeable events, narrows them through the
//! reasoning service, and selects a single trade. Every attempt leaves one
//! terminal record in the audit trail, success or not.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::coerce_items;
use crate::adapters::{ExecutionSink, LocalIndex, MarketFeed};
use crate::agent::ReasoningAgent;
use crate::config::{ExecutionConfig, PipelineConfig};
use crate::domain::{Event, Market};
use crate::error::Result;
use crate::persistence::{to_document, HistoryLog, TradeOperationRecord};

const OPERATION: &str = "one_best_trade";

enum Attempt {
    Traded,
    NoCandidates,
}

pub struct Trader {
    feed: Arc<dyn MarketFeed>,
    agent: Arc<dyn ReasoningAgent>,
    executor: Arc<dyn ExecutionSink>,
    history: Arc<HistoryLog>,
    pipeline: PipelineConfig,
    execution: ExecutionConfig,
}

impl Trader {
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        agent: Arc<dyn ReasoningAgent>,
        executor: Arc<dyn ExecutionSink>,
        history: Arc<HistoryLog>,
        pipeline: PipelineConfig,
        execution: ExecutionConfig,
    ) -> Self {
        Self {
            feed,
            agent,
            executor,
            history,
            pipeline,
            execution,
        }
    }

    /// Run the pipeline until it produces a terminal outcome. A collaborator
    /// failure is recorded and retried from fetch; an empty candidate set and
    /// an exhausted attempt budget both end the run normally, leaving the
    /// audit trail as the observable result.
    pub async fn one_best_trade(&self) -> Result<()> {
        for attempt in 1..=self.pipeline.max_attempts {
            match self.attempt().await {
                Ok(Attempt::Traded) | Ok(Attempt::NoCandidates) => return Ok(()),
                Err(e) => {
                    let error_msg = e.to_string();
                    error!("Error in {OPERATION} (attempt {attempt}): {error_msg}");
                    self.history
                        .log_trade_operation(TradeOperationRecord {
                            operation_type: OPERATION.to_string(),
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
        Ok(())
    }

    async fn attempt(&self) -> Result<Attempt> {
        self.pre_trade_logic();

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
                .log_trade_operation(TradeOperationRecord {
                    operation_type: OPERATION.to_string(),
                    events_count: Some(events_count),
                    markets_count: Some(markets_count),
                    filtered_events_count: Some(filtered_events_count),
                    filtered_markets_count: Some(filtered_markets_count),
                    success: false,
                    error: Some("No markets found after filtering".to_string()),
                    ..Default::default()
                })
                .await;
            return Ok(Attempt::NoCandidates);
        }

        let market = &filtered_markets[0];
        let decision = self.agent.select_best_trade(market).await?;
        info!("5. CALCULATED TRADE {}", decision.summary());

        let amount = decision.amount();
        if self.execution.enabled {
            let order = self.executor.execute_market_order(market, amount).await?;
            info!("6. TRADED {order}");
        }

        self.history
            .log_trade_operation(TradeOperationRecord {
                operation_type: OPERATION.to_string(),
                market_id: market.id.clone(),
                market_data: Some(to_document(market)),
                events_count: Some(events_count),
                markets_count: Some(markets_count),
                filtered_events_count: Some(filtered_events_count),
                filtered_markets_count: Some(filtered_markets_count),
                best_trade: Some(decision.summary()),
                amount: Some(amount),
                success: true,
                ..Default::default()
            })
            .await;

        Ok(Attempt::Traded)
    }

    /// Best-effort clearing of the local retrieval snapshots so every run
    /// starts from a clean index.
    fn pre_trade_logic(&self) {
        LocalIndex::clear_all(&self.pipeline.cache_dirs);
    }
}
