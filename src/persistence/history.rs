//! Typed audit-log façade over the document store.
//!
//! One logging operation per pipeline-event category. Each builds a flat
//! record with a fixed `type` discriminator, normalizes embedded payloads,
//! and appends it to the category's collection. Records are immutable once
//! written; the only supported read-back ordering is most-recent-first.
//!
//! Whether a write actually persisted is reported through the returned id:
//! `None` means the store dropped it (disabled or failed), which callers
//! treat as acceptable degradation.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::adapters::{DocumentStore, SortOrder};

pub const CLI_HISTORY: &str = "cli_history";
pub const TRADE_HISTORY: &str = "trade_history";
pub const MARKET_CREATION_HISTORY: &str = "market_creation_history";
pub const LLM_HISTORY: &str = "llm_history";
pub const MARKET_QUERY_HISTORY: &str = "market_query_history";
pub const RAG_HISTORY: &str = "rag_history";
pub const NEWS_QUERY_HISTORY: &str = "news_query_history";

/// Normalize any serializable payload to a storable JSON value.
/// Serialization failures degrade to the Debug representation so the write
/// is still attempted.
pub fn to_document<T: Serialize + fmt::Debug>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(normalized) => normalized,
        Err(e) => {
            warn!("Could not serialize payload: {e}");
            Value::String(format!("{value:?}"))
        }
    }
}

/// A CLI command invocation.
#[derive(Debug, Clone)]
pub struct CliCommandRecord {
    pub command: String,
    pub parameters: Value,
    pub result: Option<Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for CliCommandRecord {
    fn default() -> Self {
        Self {
            command: String::new(),
            parameters: json!({}),
            result: None,
            success: true,
            error: None,
        }
    }
}

/// One trade-pipeline attempt, terminal or failed.
#[derive(Debug, Clone)]
pub struct TradeOperationRecord {
    pub operation_type: String,
    pub market_id: Option<String>,
    pub market_data: Option<Value>,
    pub trade_data: Option<Value>,
    pub events_count: Option<u64>,
    pub markets_count: Option<u64>,
    pub filtered_events_count: Option<u64>,
    pub filtered_markets_count: Option<u64>,
    pub best_trade: Option<String>,
    pub amount: Option<Decimal>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for TradeOperationRecord {
    fn default() -> Self {
        Self {
            operation_type: String::new(),
            market_id: None,
            market_data: None,
            trade_data: None,
            events_count: None,
            markets_count: None,
            filtered_events_count: None,
            filtered_markets_count: None,
            best_trade: None,
            amount: None,
            success: true,
            error: None,
        }
    }
}

/// One market-creation attempt.
#[derive(Debug, Clone)]
pub struct MarketCreationRecord {
    pub market_description: Option<String>,
    pub events_count: Option<u64>,
    pub markets_count: Option<u64>,
    pub filtered_events_count: Option<u64>,
    pub filtered_markets_count: Option<u64>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for MarketCreationRecord {
    fn default() -> Self {
        Self {
            market_description: None,
            events_count: None,
            markets_count: None,
            filtered_events_count: None,
            filtered_markets_count: None,
            success: true,
            error: None,
        }
    }
}

/// One reasoning-service query made on behalf of the user.
#[derive(Debug, Clone)]
pub struct LlmQueryRecord {
    pub query_type: String,
    pub user_input: String,
    pub response: Option<String>,
    pub model: Option<String>,
    pub tokens_used: Option<u64>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for LlmQueryRecord {
    fn default() -> Self {
        Self {
            query_type: String::new(),
            user_input: String::new(),
            response: None,
            model: None,
            tokens_used: None,
            success: true,
            error: None,
        }
    }
}

/// One market/event listing query.
#[derive(Debug, Clone)]
pub struct MarketQueryRecord {
    pub query_type: String,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub results_count: Option<u64>,
    /// Full result set; only a summary of the first few is stored.
    pub markets: Vec<Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for MarketQueryRecord {
    fn default() -> Self {
        Self {
            query_type: String::new(),
            limit: None,
            sort_by: None,
            results_count: None,
            markets: Vec::new(),
            success: true,
            error: None,
        }
    }
}

/// One retrieval-snapshot operation.
#[derive(Debug, Clone)]
pub struct RagOperationRecord {
    pub operation_type: String,
    pub query: Option<String>,
    pub local_directory: Option<String>,
    pub results_count: Option<u64>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for RagOperationRecord {
    fn default() -> Self {
        Self {
            operation_type: String::new(),
            query: None,
            local_directory: None,
            results_count: None,
            success: true,
            error: None,
        }
    }
}

/// One news query.
#[derive(Debug, Clone)]
pub struct NewsQueryRecord {
    pub keywords: String,
    pub articles_count: Option<u64>,
    /// Full result set; only a summary of the first few is stored.
    pub articles: Vec<Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl Default for NewsQueryRecord {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            articles_count: None,
            articles: Vec::new(),
            success: true,
            error: None,
        }
    }
}

/// Audit log over a document store. Construct once per process and share via
/// `Arc`; lifecycle is owned by the caller.
pub struct HistoryLog {
    store: Arc<dyn DocumentStore>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn log_cli_command(&self, record: CliCommandRecord) -> Option<String> {
        let document = build_cli_command(record);
        self.store.insert_one(CLI_HISTORY, document).await
    }

    pub async fn log_trade_operation(&self, record: TradeOperationRecord) -> Option<String> {
        let document = build_trade_operation(record);
        self.store.insert_one(TRADE_HISTORY, document).await
    }

    pub async fn log_market_creation(&self, record: MarketCreationRecord) -> Option<String> {
        let document = build_market_creation(record);
        self.store.insert_one(MARKET_CREATION_HISTORY, document).await
    }

    pub async fn log_llm_query(&self, record: LlmQueryRecord) -> Option<String> {
        let document = build_llm_query(record);
        self.store.insert_one(LLM_HISTORY, document).await
    }

    pub async fn log_market_query(&self, record: MarketQueryRecord) -> Option<String> {
        let document = build_market_query(record);
        self.store.insert_one(MARKET_QUERY_HISTORY, document).await
    }

    pub async fn log_rag_operation(&self, record: RagOperationRecord) -> Option<String> {
        let document = build_rag_operation(record);
        self.store.insert_one(RAG_HISTORY, document).await
    }

    pub async fn log_news_query(&self, record: NewsQueryRecord) -> Option<String> {
        let document = build_news_query(record);
        self.store.insert_one(NEWS_QUERY_HISTORY, document).await
    }

    /// Retrieve history from a collection, most recent first.
    pub async fn get_history(
        &self,
        collection: &str,
        limit: i64,
        filter: Option<&Value>,
    ) -> Vec<Value> {
        self.store
            .find(collection, filter, Some(limit), SortOrder::Descending)
            .await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn attach_error(document: &mut Value, error: Option<String>) {
    if let Some(error) = error {
        if !error.is_empty() {
            document["error"] = Value::String(error);
        }
    }
}

fn build_cli_command(record: CliCommandRecord) -> Value {
    let parameters = if record.parameters.is_null() {
        json!({})
    } else {
        record.parameters
    };

    let mut document = json!({
        "type": "cli_command",
        "command": record.command,
        "parameters": parameters,
        "success": record.success,
    });
    if let Some(result) = record.result {
        document["result"] = result;
    }
    attach_error(&mut document, record.error);
    document
}

fn build_trade_operation(record: TradeOperationRecord) -> Value {
    let mut document = json!({
        "type": "trade_operation",
        "operation_type": record.operation_type,
        "market_id": record.market_id,
        "events_count": record.events_count,
        "markets_count": record.markets_count,
        "filtered_events_count": record.filtered_events_count,
        "filtered_markets_count": record.filtered_markets_count,
        "best_trade": record.best_trade,
        "amount": record.amount,
        "success": record.success,
    });
    if let Some(market_data) = record.market_data {
        document["market_data"] = market_data;
    }
    if let Some(trade_data) = record.trade_data {
        document["trade_data"] = trade_data;
    }
    attach_error(&mut document, record.error);
    document
}

fn build_market_creation(record: MarketCreationRecord) -> Value {
    let mut document = json!({
        "type": "market_creation",
        "market_description": record.market_description,
        "events_count": record.events_count,
        "markets_count": record.markets_count,
        "filtered_events_count": record.filtered_events_count,
        "filtered_markets_count": record.filtered_markets_count,
        "success": record.success,
    });
    attach_error(&mut document, record.error);
    document
}

fn build_llm_query(record: LlmQueryRecord) -> Value {
    let mut document = json!({
        "type": "llm_query",
        "query_type": record.query_type,
        "user_input": record.user_input,
        "response": record.response,
        "model": record.model,
        "tokens_used": record.tokens_used,
        "success": record.success,
    });
    attach_error(&mut document, record.error);
    document
}

fn build_market_query(record: MarketQueryRecord) -> Value {
    let mut document = json!({
        "type": "market_query",
        "query_type": record.query_type,
        "limit": record.limit,
        "sort_by": record.sort_by,
        "results_count": record.results_count,
        "success": record.success,
    });
    if !record.markets.is_empty() {
        let summary: Vec<Value> = record
            .markets
            .iter()
            .take(10)
            .map(|market| {
                json!({
                    "id": market.get("id").cloned().unwrap_or(Value::Null),
                    "question": market.get("question").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();
        document["markets_summary"] = Value::Array(summary);
    }
    attach_error(&mut document, record.error);
    document
}

fn build_rag_operation(record: RagOperationRecord) -> Value {
    let mut document = json!({
        "type": "rag_operation",
        "operation_type": record.operation_type,
        "query": record.query,
        "local_directory": record.local_directory,
        "results_count": record.results_count,
        "success": record.success,
    });
    attach_error(&mut document, record.error);
    document
}

fn build_news_query(record: NewsQueryRecord) -> Value {
    let mut document = json!({
        "type": "news_query",
        "keywords": record.keywords,
        "articles_count": record.articles_count,
        "success": record.success,
    });
    if !record.articles.is_empty() {
        let summary: Vec<Value> = record
            .articles
            .iter()
            .take(10)
            .map(|article| {
                json!({
                    "title": article.get("title").cloned().unwrap_or(Value::Null),
                    "source": article
                        .get("source")
                        .and_then(|source| source.get("name"))
                        .cloned()
                        .unwrap_or(Value::Null),
                    "url": article.get("url").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();
        document["articles_summary"] = Value::Array(summary);
    }
    attach_error(&mut document, record.error);
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::document_store::memory::MemoryDocumentStore;
    use std::collections::BTreeMap;

    fn history() -> (Arc<MemoryDocumentStore>, HistoryLog) {
        let store = Arc::new(MemoryDocumentStore::new());
        let log = HistoryLog::new(store.clone());
        (store, log)
    }

    #[test]
    fn cli_record_carries_type_tag_and_defaults() {
        let document = build_cli_command(CliCommandRecord {
            command: "markets".to_string(),
            ..Default::default()
        });
        assert_eq!(document["type"], json!("cli_command"));
        assert_eq!(document["parameters"], json!({}));
        assert_eq!(document["success"], json!(true));
        assert!(document.get("error").is_none());
        assert!(document.get("result").is_none());
    }

    #[test]
    fn empty_error_string_is_not_attached() {
        let document = build_trade_operation(TradeOperationRecord {
            operation_type: "one_best_trade".to_string(),
            success: false,
            error: Some(String::new()),
            ..Default::default()
        });
        assert!(document.get("error").is_none());
    }

    #[test]
    fn trade_record_keeps_all_counts_even_when_absent() {
        let document = build_trade_operation(TradeOperationRecord {
            operation_type: "one_best_trade".to_string(),
            events_count: Some(10),
            success: false,
            error: Some("boom".to_string()),
            ..Default::default()
        });
        assert_eq!(document["events_count"], json!(10));
        assert_eq!(document["markets_count"], Value::Null);
        assert_eq!(document["error"], json!("boom"));
    }

    #[test]
    fn market_query_summarizes_first_ten() {
        let markets: Vec<Value> = (0..15)
            .map(|i| json!({"id": i.to_string(), "question": format!("Q{i}"), "noise": i}))
            .collect();
        let document = build_market_query(MarketQueryRecord {
            query_type: "get_all_markets".to_string(),
            results_count: Some(15),
            markets,
            ..Default::default()
        });

        let summary = document["markets_summary"].as_array().unwrap();
        assert_eq!(summary.len(), 10);
        assert_eq!(summary[0], json!({"id": "0", "question": "Q0"}));
    }

    #[test]
    fn news_summary_pulls_source_name() {
        let document = build_news_query(NewsQueryRecord {
            keywords: "elections".to_string(),
            articles_count: Some(1),
            articles: vec![json!({
                "title": "T",
                "source": {"id": null, "name": "Example Times"},
                "url": "https://example.com",
            })],
            ..Default::default()
        });
        assert_eq!(
            document["articles_summary"][0]["source"],
            json!("Example Times")
        );
    }

    #[test]
    fn normalization_recurses_nested_maps() {
        let mut inner = BTreeMap::new();
        inner.insert("b".to_string(), 2u32);
        let mut outer = BTreeMap::new();
        outer.insert("a".to_string(), inner);

        let document = to_document(&outer);
        assert_eq!(document, json!({"a": {"b": 2}}));
    }

    #[test]
    fn normalization_falls_back_to_debug_string() {
        #[derive(Debug)]
        struct Opaque;

        impl Serialize for Opaque {
            fn serialize<S: serde::Serializer>(
                &self,
                _serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("opaque value"))
            }
        }

        let document = to_document(&Opaque);
        assert_eq!(document, json!("Opaque"));
    }

    #[tokio::test]
    async fn logging_attaches_write_time_timestamp() {
        let (store, log) = history();
        log.log_rag_operation(RagOperationRecord {
            operation_type: "index_markets".to_string(),
            results_count: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();

        let records = store.find(RAG_HISTORY, None, None, SortOrder::Descending).await;
        assert_eq!(records.len(), 1);
        assert!(records[0]["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn get_history_returns_most_recent_first() {
        let (store, log) = history();
        for ts in [
            "2025-01-01T00:00:01.000000Z",
            "2025-01-01T00:00:02.000000Z",
            "2025-01-01T00:00:03.000000Z",
        ] {
            store
                .insert_one(
                    LLM_HISTORY,
                    json!({"type": "llm_query", "timestamp": ts}),
                )
                .await
                .unwrap();
        }

        let records = log.get_history(LLM_HISTORY, 100, None).await;
        let timestamps: Vec<&str> = records
            .iter()
            .map(|r| r["timestamp"].as_str().unwrap())
            .collect();
        assert_eq!(
            timestamps,
            vec![
                "2025-01-01T00:00:03.000000Z",
                "2025-01-01T00:00:02.000000Z",
                "2025-01-01T00:00:01.000000Z",
            ]
        );
    }

    #[tokio::test]
    async fn degraded_store_yields_no_id_without_error() {
        let log = HistoryLog::new(Arc::new(crate::adapters::PostgresDocumentStore::disabled()));
        let id = log
            .log_cli_command(CliCommandRecord {
                command: "markets".to_string(),
                ..Default::default()
            })
            .await;
        assert!(id.is_none());
    }
}
