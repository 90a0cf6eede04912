//! Upstream collaborators: market feed, news feed, document store, order
//! execution, and the local retrieval snapshot.

pub mod document_store;
pub mod execution;
pub mod gamma;
pub mod local_index;
pub mod news;

pub use document_store::{DocumentStore, PostgresDocumentStore, SortOrder};
pub use execution::{ExecutionSink, PaperExecutor};
pub use gamma::GammaClient;
pub use local_index::LocalIndex;
pub use news::{Article, NewsClient};

use crate::domain::{Event, Market};
use crate::error::Result;
use async_trait::async_trait;

/// Upstream source of tradeable events and markets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// All events currently open for trading.
    async fn get_all_tradeable_events(&self) -> Result<Vec<Event>>;

    async fn get_all_events(&self, limit: u32) -> Result<Vec<Event>>;

    async fn get_all_markets(&self, limit: u32) -> Result<Vec<Market>>;

    /// Markets ordered by 24-hour volume, busiest first.
    async fn get_trending_markets(&self, limit: u32) -> Result<Vec<Market>>;
}
