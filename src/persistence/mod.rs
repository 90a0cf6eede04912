pub mod history;

pub use history::{
    to_document, CliCommandRecord, HistoryLog, LlmQueryRecord, MarketCreationRecord,
    MarketQueryRecord, NewsQueryRecord, RagOperationRecord, TradeOperationRecord, CLI_HISTORY,
    LLM_HISTORY, MARKET_CREATION_HISTORY, MARKET_QUERY_HISTORY, NEWS_QUERY_HISTORY, RAG_HISTORY,
    TRADE_HISTORY,
};
