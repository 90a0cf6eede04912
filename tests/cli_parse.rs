//! Command-surface shape tests: every advertised subcommand parses, with its
//! documented defaults.

use clap::Parser;
use polyagent::cli::{Cli, Commands};

#[test]
fn markets_defaults() {
    let cli = Cli::try_parse_from(["polyagent", "markets"]).unwrap();
    match cli.command {
        Commands::Markets { limit, sort_by } => {
            assert_eq!(limit, 5);
            assert_eq!(sort_by, "spread");
        }
        other => panic!("parsed wrong command: {other:?}"),
    }
}

#[test]
fn events_accepts_sort_override() {
    let cli = Cli::try_parse_from(["polyagent", "events", "--limit", "12", "--sort-by", "volume"])
        .unwrap();
    match cli.command {
        Commands::Events { limit, sort_by } => {
            assert_eq!(limit, 12);
            assert_eq!(sort_by, "volume");
        }
        other => panic!("parsed wrong command: {other:?}"),
    }
}

#[test]
fn superforecaster_requires_all_fields() {
    assert!(Cli::try_parse_from(["polyagent", "superforecaster", "--event-title", "t"]).is_err());

    let cli = Cli::try_parse_from([
        "polyagent",
        "superforecaster",
        "--event-title",
        "Election",
        "--question",
        "Who wins?",
        "--outcome",
        "candidate A",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Superforecaster { .. }));
}

#[test]
fn pipeline_commands_take_no_arguments() {
    assert!(matches!(
        Cli::try_parse_from(["polyagent", "trade"]).unwrap().command,
        Commands::Trade
    ));
    assert!(matches!(
        Cli::try_parse_from(["polyagent", "create-market"])
            .unwrap()
            .command,
        Commands::CreateMarket
    ));
}

#[test]
fn history_defaults_to_trade_collection() {
    let cli = Cli::try_parse_from(["polyagent", "history"]).unwrap();
    match cli.command {
        Commands::History { collection, limit } => {
            assert_eq!(collection, "trade_history");
            assert_eq!(limit, 20);
        }
        other => panic!("parsed wrong command: {other:?}"),
    }
}

#[test]
fn config_dir_is_global() {
    let cli = Cli::try_parse_from(["polyagent", "--config-dir", "/etc/polyagent", "trade"]).unwrap();
    assert_eq!(cli.config_dir, "/etc/polyagent");
}
