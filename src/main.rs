use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use eyre::Result;
use log::{info, warn};

use eddy::arb::search::Searcher;
use eddy::arb::types::SearchResult;
use eddy::config::Config;
use eddy::exchange::paper::PaperFactory;
use eddy::exchange::ExchangeFactory;
use eddy::limiter::RateLimiter;
use eddy::utils::logger::setup_logger;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search over the configured market and print the rows
    Scan {
        /// Emit the rows as a JSON array instead of text
        #[arg(long)]
        json: bool,
    },
    /// Keep searching on a fixed period until interrupted
    Watch,
}

/// Builds a fresh venue set and runs one full search.
///
/// The rate limiter lives for exactly one round, so a watch that is
/// interrupted between rounds leaves no ticker behind.
async fn run_search(config: &Config) -> Result<Vec<SearchResult>> {
    let limiter = Arc::new(match config.max_calls_per_window {
        Some(max) => RateLimiter::bounded(max),
        None => RateLimiter::unbounded(),
    });
    let factories: Vec<Box<dyn ExchangeFactory>> =
        vec![Box::new(PaperFactory::new(config.market.clone(), limiter))];
    let searcher = Searcher::from_factories(&factories, config.tokens.clone()).await?;
    info!(
        "Searching {} venues across {} tokens at {} capitals",
        searcher.venues().len(),
        searcher.tokens().len(),
        config.capitals.len()
    );
    searcher.search(&config.capitals).await
}

async fn scan(config: &Config, json: bool) -> Result<()> {
    let results = run_search(config).await?;
    if json {
        let rows: Vec<serde_json::Value> = results.iter().map(SearchResult::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if results.is_empty() {
        println!("Nothing searched: no venue pair was fully probed");
    } else {
        for row in &results {
            println!("{row}");
        }
    }
    Ok(())
}

async fn watch(config: &Config) -> Result<()> {
    let period = Duration::from_secs(config.watch_period_secs);
    loop {
        if let Err(err) = scan(config, false).await {
            warn!("Search round failed: {err}");
        }
        info!("Next search in {}s", period.as_secs());
        tokio::select! {
            () = tokio::time::sleep(period) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logger().expect("Failed to set up logger");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    match cli.command {
        Some(Commands::Scan { json }) => scan(&config, json).await?,
        Some(Commands::Watch) => watch(&config).await?,
        None => scan(&config, false).await?,
    }

    Ok(())
}
