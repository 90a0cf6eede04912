use clap::Parser;
use polyagent::cli::{commands, Cli, Commands};
use polyagent::config::AppConfig;
use polyagent::error::{PolyagentError, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config.logging.level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            warn!("Config: {error}");
        }
        return Err(PolyagentError::Validation(errors.join("; ")));
    }

    let ctx = commands::AppContext::init(config).await?;

    let result = match &cli.command {
        Commands::Markets { limit, sort_by } => commands::markets(&ctx, *limit, sort_by).await,
        Commands::Trending { limit } => commands::trending(&ctx, *limit).await,
        Commands::Events { limit, sort_by } => commands::events(&ctx, *limit, sort_by).await,
        Commands::News { keywords } => commands::news(&ctx, keywords).await,
        Commands::Ask { question } => commands::ask(&ctx, question).await,
        Commands::AskMarkets { question } => commands::ask_markets(&ctx, question).await,
        Commands::Superforecaster {
            event_title,
            question,
            outcome,
        } => commands::superforecaster(&ctx, event_title, question, outcome).await,
        Commands::IndexMarkets { directory } => commands::index_markets(&ctx, directory).await,
        Commands::QueryIndex { directory, query } => {
            commands::query_index(&ctx, directory, query).await
        }
        Commands::Trade => commands::trade(&ctx).await,
        Commands::CreateMarket => commands::create_market(&ctx).await,
        Commands::History { collection, limit } => {
            commands::history(&ctx, collection, *limit).await
        }
    };

    ctx.history.close().await;
    result
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},sqlx=warn")));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
