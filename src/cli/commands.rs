//! Command handlers. Each talks to its collaborator, prints the result, and
//! writes the audit records before surfacing any error to the shell.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::adapters::{
    GammaClient, LocalIndex, MarketFeed, NewsClient, PaperExecutor, PostgresDocumentStore,
};
use crate::agent::{LlmGatewayClient, ReasoningAgent};
use crate::config::AppConfig;
use crate::domain::{Event, Market};
use crate::error::Result;
use crate::persistence::{
    to_document, CliCommandRecord, HistoryLog, LlmQueryRecord, MarketQueryRecord, NewsQueryRecord,
    RagOperationRecord,
};
use crate::pipeline::{Creator, Trader};

/// Explicitly constructed application context, passed to every handler.
/// Owns the collaborator clients and the audit log for one process.
pub struct AppContext {
    pub config: AppConfig,
    pub history: Arc<HistoryLog>,
    pub feed: Arc<GammaClient>,
    pub agent: Arc<LlmGatewayClient>,
}

impl AppContext {
    pub async fn init(config: AppConfig) -> Result<Self> {
        let store = Arc::new(PostgresDocumentStore::connect(&config.store).await);
        let history = Arc::new(HistoryLog::new(store));
        let feed = Arc::new(GammaClient::new(&config.feed)?);
        let agent = Arc::new(LlmGatewayClient::new(&config.agent)?);
        Ok(Self {
            config,
            history,
            feed,
            agent,
        })
    }
}

async fn log_command_success(ctx: &AppContext, command: &str, parameters: Value, result: Value) {
    ctx.history
        .log_cli_command(CliCommandRecord {
            command: command.to_string(),
            parameters,
            result: Some(result),
            ..Default::default()
        })
        .await;
}

async fn log_command_failure(ctx: &AppContext, command: &str, parameters: Value, error: &str) {
    ctx.history
        .log_cli_command(CliCommandRecord {
            command: command.to_string(),
            parameters,
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        })
        .await;
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(e) => warn!("Could not render result: {e}"),
    }
}

fn sort_markets(markets: &mut [Market], sort_by: &str) {
    match sort_by {
        "spread" => markets.sort_by(|a, b| {
            b.spread
                .unwrap_or_default()
                .cmp(&a.spread.unwrap_or_default())
        }),
        "volume" => markets.sort_by(|a, b| {
            b.volume_24hr
                .unwrap_or_default()
                .cmp(&a.volume_24hr.unwrap_or_default())
        }),
        other => warn!("Unknown market sort key '{other}', keeping feed order"),
    }
}

fn sort_events(events: &mut [Event], sort_by: &str) {
    match sort_by {
        "number_of_markets" => events.sort_by_key(|e| std::cmp::Reverse(e.markets.len())),
        "volume" => events.sort_by(|a, b| {
            b.volume
                .unwrap_or_default()
                .cmp(&a.volume.unwrap_or_default())
        }),
        other => warn!("Unknown event sort key '{other}', keeping feed order"),
    }
}

pub async fn markets(ctx: &AppContext, limit: u32, sort_by: &str) -> Result<()> {
    let parameters = json!({"limit": limit, "sort_by": sort_by});
    println!("Fetching {limit} markets, sorted by {sort_by}");

    let fetched = ctx.feed.get_all_markets(ctx.config.feed.page_limit).await;
    match fetched {
        Ok(mut markets) => {
            markets.retain(Market::is_tradeable);
            sort_markets(&mut markets, sort_by);
            markets.truncate(limit as usize);
            print_json(&markets);

            ctx.history
                .log_market_query(MarketQueryRecord {
                    query_type: "get_all_markets".to_string(),
                    limit: Some(limit as u64),
                    sort_by: Some(sort_by.to_string()),
                    results_count: Some(markets.len() as u64),
                    markets: markets.iter().map(to_document).collect(),
                    ..Default::default()
                })
                .await;
            log_command_success(
                ctx,
                "markets",
                parameters,
                json!({"markets_count": markets.len()}),
            )
            .await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_market_query(MarketQueryRecord {
                    query_type: "get_all_markets".to_string(),
                    limit: Some(limit as u64),
                    sort_by: Some(sort_by.to_string()),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, "markets", parameters, &error_msg).await;
            Err(e)
        }
    }
}

pub async fn trending(ctx: &AppContext, limit: u32) -> Result<()> {
    let parameters = json!({"limit": limit});
    println!("Fetching {limit} trending markets (sorted by 24h volume)");

    match ctx.feed.get_trending_markets(limit).await {
        Ok(markets) => {
            println!("Found {} trending markets:", markets.len());
            print_json(&markets);
            ctx.history
                .log_market_query(MarketQueryRecord {
                    query_type: "get_trending_markets".to_string(),
                    limit: Some(limit as u64),
                    results_count: Some(markets.len() as u64),
                    markets: markets.iter().map(to_document).collect(),
                    ..Default::default()
                })
                .await;
            log_command_success(
                ctx,
                "trending",
                parameters,
                json!({"markets_count": markets.len()}),
            )
            .await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_market_query(MarketQueryRecord {
                    query_type: "get_trending_markets".to_string(),
                    limit: Some(limit as u64),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, "trending", parameters, &error_msg).await;
            Err(e)
        }
    }
}

pub async fn events(ctx: &AppContext, limit: u32, sort_by: &str) -> Result<()> {
    let parameters = json!({"limit": limit, "sort_by": sort_by});
    println!("Fetching {limit} events, sorted by {sort_by}");

    match ctx.feed.get_all_events(ctx.config.feed.page_limit).await {
        Ok(mut events) => {
            sort_events(&mut events, sort_by);
            events.truncate(limit as usize);
            print_json(&events);
            ctx.history
                .log_market_query(MarketQueryRecord {
                    query_type: "get_all_events".to_string(),
                    limit: Some(limit as u64),
                    sort_by: Some(sort_by.to_string()),
                    results_count: Some(events.len() as u64),
                    ..Default::default()
                })
                .await;
            log_command_success(
                ctx,
                "events",
                parameters,
                json!({"events_count": events.len()}),
            )
            .await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_market_query(MarketQueryRecord {
                    query_type: "get_all_events".to_string(),
                    limit: Some(limit as u64),
                    sort_by: Some(sort_by.to_string()),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, "events", parameters, &error_msg).await;
            Err(e)
        }
    }
}

pub async fn news(ctx: &AppContext, keywords: &str) -> Result<()> {
    let parameters = json!({"keywords": keywords});
    let client = NewsClient::new(&ctx.config.news)?;

    match client.get_relevant_news(keywords).await {
        Ok(articles) => {
            println!("Found {} articles:", articles.len());
            print_json(&articles);
            ctx.history
                .log_news_query(NewsQueryRecord {
                    keywords: keywords.to_string(),
                    articles_count: Some(articles.len() as u64),
                    articles: articles.iter().map(to_document).collect(),
                    ..Default::default()
                })
                .await;
            log_command_success(
                ctx,
                "news",
                parameters,
                json!({"articles_count": articles.len()}),
            )
            .await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_news_query(NewsQueryRecord {
                    keywords: keywords.to_string(),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, "news", parameters, &error_msg).await;
            Err(e)
        }
    }
}

async fn run_llm_query(
    ctx: &AppContext,
    command: &str,
    query_type: &str,
    user_input: String,
    response: Result<String>,
) -> Result<()> {
    let parameters = json!({"input": user_input});
    match response {
        Ok(answer) => {
            println!("{answer}");
            ctx.history
                .log_llm_query(LlmQueryRecord {
                    query_type: query_type.to_string(),
                    user_input,
                    response: Some(answer),
                    model: Some(ctx.config.agent.model.clone()),
                    ..Default::default()
                })
                .await;
            log_command_success(ctx, command, parameters, json!({"answered": true})).await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_llm_query(LlmQueryRecord {
                    query_type: query_type.to_string(),
                    user_input,
                    model: Some(ctx.config.agent.model.clone()),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, command, parameters, &error_msg).await;
            Err(e)
        }
    }
}

pub async fn ask(ctx: &AppContext, question: &str) -> Result<()> {
    let response = ctx.agent.ask(question).await;
    run_llm_query(ctx, "ask", "ask_llm", question.to_string(), response).await
}

pub async fn ask_markets(ctx: &AppContext, question: &str) -> Result<()> {
    let response = match ctx.feed.get_trending_markets(20).await {
        Ok(markets) => ctx.agent.ask_with_markets(question, &markets).await,
        Err(e) => Err(e),
    };
    run_llm_query(
        ctx,
        "ask-markets",
        "ask_polymarket_llm",
        question.to_string(),
        response,
    )
    .await
}

pub async fn superforecaster(
    ctx: &AppContext,
    event_title: &str,
    question: &str,
    outcome: &str,
) -> Result<()> {
    let response = ctx
        .agent
        .superforecast(event_title, question, outcome)
        .await;
    run_llm_query(
        ctx,
        "superforecaster",
        "superforecaster",
        format!("{event_title} | {question} | {outcome}"),
        response,
    )
    .await
}

pub async fn index_markets(ctx: &AppContext, directory: &str) -> Result<()> {
    let parameters = json!({"directory": directory});

    let built = match ctx.feed.get_all_markets(ctx.config.feed.page_limit).await {
        Ok(markets) => LocalIndex::new(directory).build(&markets),
        Err(e) => Err(e),
    };

    match built {
        Ok(count) => {
            println!("Indexed {count} markets into {directory}");
            ctx.history
                .log_rag_operation(RagOperationRecord {
                    operation_type: "index_markets".to_string(),
                    local_directory: Some(directory.to_string()),
                    results_count: Some(count),
                    ..Default::default()
                })
                .await;
            log_command_success(ctx, "index-markets", parameters, json!({"indexed": count}))
                .await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_rag_operation(RagOperationRecord {
                    operation_type: "index_markets".to_string(),
                    local_directory: Some(directory.to_string()),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, "index-markets", parameters, &error_msg).await;
            Err(e)
        }
    }
}

pub async fn query_index(ctx: &AppContext, directory: &str, query: &str) -> Result<()> {
    let parameters = json!({"directory": directory, "query": query});

    let answered = async {
        let markets = LocalIndex::new(directory).load()?;
        let answer = ctx.agent.ask_with_markets(query, &markets).await?;
        Ok::<_, crate::error::PolyagentError>((markets.len() as u64, answer))
    }
    .await;

    match answered {
        Ok((count, answer)) => {
            println!("{answer}");
            ctx.history
                .log_rag_operation(RagOperationRecord {
                    operation_type: "query_index".to_string(),
                    query: Some(query.to_string()),
                    local_directory: Some(directory.to_string()),
                    results_count: Some(count),
                    ..Default::default()
                })
                .await;
            log_command_success(ctx, "query-index", parameters, json!({"answered": true})).await;
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            eprintln!("Error: {error_msg}");
            ctx.history
                .log_rag_operation(RagOperationRecord {
                    operation_type: "query_index".to_string(),
                    query: Some(query.to_string()),
                    local_directory: Some(directory.to_string()),
                    success: false,
                    error: Some(error_msg.clone()),
                    ..Default::default()
                })
                .await;
            log_command_failure(ctx, "query-index", parameters, &error_msg).await;
            Err(e)
        }
    }
}

pub async fn trade(ctx: &AppContext) -> Result<()> {
    println!("Running the autonomous trader...");
    let trader = Trader::new(
        ctx.feed.clone(),
        ctx.agent.clone(),
        Arc::new(PaperExecutor::new()),
        ctx.history.clone(),
        ctx.config.pipeline.clone(),
        ctx.config.execution.clone(),
    );
    // The pipeline absorbs its own failures; the audit trail has the detail.
    trader.one_best_trade().await?;
    log_command_success(ctx, "trade", json!({}), json!({"completed": true})).await;
    Ok(())
}

pub async fn create_market(ctx: &AppContext) -> Result<()> {
    println!("Running the market creator...");
    let creator = Creator::new(
        ctx.feed.clone(),
        ctx.agent.clone(),
        ctx.history.clone(),
        ctx.config.pipeline.clone(),
    );
    let idea = creator.one_best_market().await?;
    match &idea {
        Some(description) => println!("Best market to create:\n{description}"),
        None => println!("No market idea produced; see market_creation_history for detail"),
    }
    log_command_success(
        ctx,
        "create-market",
        json!({}),
        json!({"market_description": idea}),
    )
    .await;
    Ok(())
}

pub async fn history(ctx: &AppContext, collection: &str, limit: i64) -> Result<()> {
    let records = ctx.history.get_history(collection, limit, None).await;
    println!("{} records from {collection}:", records.len());
    print_json(&records);
    log_command_success(
        ctx,
        "history",
        json!({"collection": collection, "limit": limit}),
        json!({"records_count": records.len()}),
    )
    .await;
    Ok(())
}
