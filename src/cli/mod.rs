//! polyagent CLI: market queries, reasoning queries, and pipeline runs.
//!
//! Every subcommand is recorded in the audit trail: one record in the
//! command's own category plus one `cli_command` record.

pub mod commands;

use clap::{Parser, Subcommand};

/// Autonomous prediction-market agent
#[derive(Parser, Debug)]
#[command(name = "polyagent")]
#[command(author, version, about = "Autonomous prediction-market trading and creation agent")]
pub struct Cli {
    /// Configuration directory
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query markets, sorted and truncated
    Markets {
        #[arg(short, long, default_value_t = 5)]
        limit: u32,
        #[arg(long, default_value = "spread")]
        sort_by: String,
    },

    /// Markets with the highest 24-hour volume
    Trending {
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },

    /// Query events
    Events {
        #[arg(short, long, default_value_t = 5)]
        limit: u32,
        #[arg(long, default_value = "number_of_markets")]
        sort_by: String,
    },

    /// Query news articles for the given keywords
    News { keywords: String },

    /// Ask the reasoning service a free-form question
    Ask { question: String },

    /// Ask with current market context attached
    AskMarkets { question: String },

    /// Forecast one outcome of a market question
    Superforecaster {
        #[arg(long)]
        event_title: String,
        #[arg(long)]
        question: String,
        #[arg(long)]
        outcome: String,
    },

    /// Snapshot current markets into a local retrieval directory
    IndexMarkets { directory: String },

    /// Answer a question against a local market snapshot
    QueryIndex { directory: String, query: String },

    /// Run the autonomous trade-selection pipeline once
    Trade,

    /// Run the market-creation pipeline once
    CreateMarket,

    /// Show audit history for a collection, most recent first
    History {
        #[arg(default_value = "trade_history")]
        collection: String,
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}
