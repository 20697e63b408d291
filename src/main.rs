use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockbook::config::{default_config_path, ResolvedConfig};
use stockbook::models::{HoldingDraft, Id};
use stockbook::portfolio::PortfolioStore;
use stockbook::quotes::AlphaVantageQuoteSource;
use stockbook::scheduler::RefreshScheduler;
use stockbook::storage::JsonFileStorage;

#[derive(Parser)]
#[command(name = "stockbook")]
#[command(about = "Local-first stock portfolio tracker")]
struct Cli {
    /// Path to config file (defaults to ./stockbook.toml, then the XDG
    /// data directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a holding (fetches a live quote for it)
    Add {
        symbol: String,
        #[arg(short, long)]
        quantity: Decimal,
        /// Purchase price paid per unit
        #[arg(short, long)]
        price: Decimal,
    },
    /// Remove a holding by id
    Remove { id: String },
    /// List holdings with portfolio totals
    List,
    /// Refresh quotes for all holdings once
    Refresh,
    /// Run the periodic refresh scheduler until interrupted
    Watch,
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    if let Command::Config = cli.command {
        println!("Config file: {}", config_path.display());
        println!("Data directory: {}", config.data_dir.display());
        println!(
            "API key: {}",
            if config.api_key().is_some() {
                "configured"
            } else {
                "demo"
            }
        );
        println!("Refresh interval: {:?}", config.refresh.interval);
        return Ok(());
    }

    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let quotes = Arc::new(AlphaVantageQuoteSource::from_configured_key(
        config.api_key(),
    ));
    let store = Arc::new(PortfolioStore::open(storage, quotes).await?);

    match cli.command {
        Command::Add {
            symbol,
            quantity,
            price,
        } => {
            let draft = HoldingDraft::new(symbol, quantity, price);
            let added = store.add_holding(&draft).await?;
            if let Some(message) = store.last_message() {
                eprintln!("{}", message.text);
            }
            if added {
                print_holdings(&store).await;
            } else {
                std::process::exit(1);
            }
        }
        Command::Remove { id } => {
            let removed = store.remove_holding(&Id::from_string(id)).await?;
            if !removed {
                eprintln!("No holding with that id.");
            }
            print_holdings(&store).await;
        }
        Command::List => {
            print_holdings(&store).await;
        }
        Command::Refresh => {
            store.refresh_all().await?;
            print_holdings(&store).await;
        }
        Command::Watch => {
            let scheduler =
                RefreshScheduler::new(Arc::clone(&store)).with_period(config.refresh.interval);
            scheduler.enable();
            println!(
                "Auto-refresh every {:?}; press Ctrl-C to stop.",
                config.refresh.interval
            );
            tokio::signal::ctrl_c().await?;
            scheduler.disable();
        }
        Command::Config => unreachable!("handled above"),
    }

    Ok(())
}

async fn print_holdings(store: &PortfolioStore) {
    let snapshot = store.snapshot().await;
    if snapshot.holdings.is_empty() {
        println!("No holdings.");
        return;
    }

    println!(
        "{:<36}  {:<8} {:>12} {:>12} {:>12}  {}",
        "ID", "SYMBOL", "QTY", "PAID", "PRICE", "UPDATED"
    );
    for holding in &snapshot.holdings {
        let price = holding
            .current_price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let updated = match holding.last_updated {
            Some(ts) => ts.format("%Y-%m-%d %H:%M UTC").to_string(),
            None if holding.is_fallback_data => "pending".to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:<36}  {:<8} {:>12} {:>12} {:>12}  {}",
            holding.id, holding.symbol, holding.quantity, holding.purchase_price, price, updated
        );
    }

    let total = store.total_value().await;
    let pl = store.total_unrealized_pl().await;
    let sign = if pl.is_sign_negative() { "-" } else { "+" };
    println!("\nTotal value: {total}");
    println!("Unrealized P/L: {sign}{}", pl.abs());
}
