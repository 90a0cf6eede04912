//! Polymarket Gamma API client (market discovery, read-only).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::MarketFeed;
use crate::config::FeedConfig;
use crate::domain::{Event, Market};
use crate::error::{PolyagentError, Result};

#[derive(Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
    page_limit: u32,
}

impl GammaClient {
    pub fn new(cfg: &FeedConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("polyagent/0.1")
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| {
                PolyagentError::Internal(format!("failed to build Gamma HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            page_limit: cfg.page_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_events(&self, query: &[(&str, String)]) -> Result<Vec<Event>> {
        let url = format!("{}/events", self.base_url);
        let events: Vec<Event> = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Gamma returned {} events", events.len());
        Ok(events)
    }

    async fn fetch_markets(&self, query: &[(&str, String)]) -> Result<Vec<Market>> {
        let url = format!("{}/markets", self.base_url);
        let markets: Vec<Market> = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Gamma returned {} markets", markets.len());
        Ok(markets)
    }
}

#[async_trait]
impl MarketFeed for GammaClient {
    async fn get_all_tradeable_events(&self) -> Result<Vec<Event>> {
        let events = self
            .fetch_events(&[
                ("active", "true".to_string()),
                ("closed", "false".to_string()),
                ("limit", self.page_limit.to_string()),
            ])
            .await?;
        Ok(filter_tradeable_events(events))
    }

    async fn get_all_events(&self, limit: u32) -> Result<Vec<Event>> {
        self.fetch_events(&[("limit", limit.to_string())]).await
    }

    async fn get_all_markets(&self, limit: u32) -> Result<Vec<Market>> {
        self.fetch_markets(&[("limit", limit.to_string())]).await
    }

    async fn get_trending_markets(&self, limit: u32) -> Result<Vec<Market>> {
        // Gamma caps per-request pages; fetch one page and rank locally.
        let markets = self
            .fetch_markets(&[
                ("active", "true".to_string()),
                ("closed", "false".to_string()),
                ("limit", self.page_limit.to_string()),
            ])
            .await?;
        Ok(rank_by_volume(markets, limit as usize))
    }
}

/// Keep only events open for trading. The API filter is advisory; stale
/// entries still come back flagged closed.
fn filter_tradeable_events(events: Vec<Event>) -> Vec<Event> {
    events.into_iter().filter(Event::is_tradeable).collect()
}

fn rank_by_volume(mut markets: Vec<Market>, limit: usize) -> Vec<Market> {
    markets.retain(Market::is_tradeable);
    markets.sort_by(|a, b| {
        b.volume_24hr
            .unwrap_or_default()
            .cmp(&a.volume_24hr.unwrap_or_default())
    });
    markets.truncate(limit);
    markets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn market(id: &str, volume: &str, active: bool) -> Market {
        serde_json::from_value(json!({
            "id": id,
            "question": format!("Q{id}"),
            "active": active,
            "closed": !active,
            "volume24hr": volume,
        }))
        .unwrap()
    }

    #[test]
    fn trending_ranks_by_volume_and_drops_closed() {
        let markets = vec![
            market("1", "10", true),
            market("2", "300", true),
            market("3", "9999", false),
            market("4", "50", true),
        ];

        let ranked = rank_by_volume(markets, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id.as_deref(), Some("2"));
        assert_eq!(ranked[0].volume_24hr, Some(dec!(300)));
        assert_eq!(ranked[1].id.as_deref(), Some("4"));
    }

    #[test]
    fn tradeable_filter_drops_closed_events() {
        let events: Vec<Event> = serde_json::from_value(json!([
            {"id": "1", "active": true, "closed": false},
            {"id": "2", "active": true, "closed": true},
            {"id": "3", "active": false, "closed": false},
        ]))
        .unwrap();

        let open = filter_tradeable_events(events);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id.as_deref(), Some("1"));
    }
}
