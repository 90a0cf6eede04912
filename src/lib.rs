pub mod adapters;
pub mod agent;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod pipeline;

pub use adapters::{
    DocumentStore, ExecutionSink, GammaClient, LocalIndex, MarketFeed, NewsClient, PaperExecutor,
    PostgresDocumentStore, SortOrder,
};
pub use agent::{LlmGatewayClient, ReasoningAgent};
pub use config::AppConfig;
pub use domain::{Event, Market, TradeDecision};
pub use error::{PolyagentError, Result};
pub use persistence::{HistoryLog, TradeOperationRecord};
pub use pipeline::{Creator, Trader};
