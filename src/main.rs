//! Trading plugin CLI
//!
//! Command-line interface over the plugin's actions, using the same
//! dispatch path an agent host would.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tradeai::plugin::{
    ACTION_EXECUTE_TRADE, ACTION_GET_MARKET_DATA, ACTION_GET_PORTFOLIO, ACTION_MONITOR_MARKET,
    ACTION_SET_TRADING_STRATEGY,
};
use tradeai::{Config, Error, Result, TradeAiPlugin};

#[derive(Parser)]
#[command(name = "tradeai")]
#[command(about = "On-chain trading plugin for AI agent hosts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a trade (a native-asset transfer to the token address)
    Trade {
        /// Network (ethereum, solana)
        #[arg(short, long)]
        network: String,

        /// Trade direction (buy, sell)
        #[arg(short, long)]
        side: String,

        /// Destination address for the transfer
        #[arg(short, long)]
        token: String,

        /// Amount in native-asset units
        #[arg(short, long)]
        amount: String,

        /// Unit price in USD
        #[arg(short, long)]
        price: String,
    },

    /// Fetch market data for a token
    MarketData {
        /// Price index asset id, e.g. 'bitcoin'
        token: String,
    },

    /// Read the wallet portfolio on a network
    Portfolio {
        /// Network (ethereum, solana)
        network: String,
    },

    /// Store a trading strategy
    Strategy {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Strategy parameters as JSON
        #[arg(long)]
        parameters: Option<String>,

        /// Mark the strategy active
        #[arg(long)]
        active: bool,
    },

    /// Open live price feeds and stream ticks to stdout
    Monitor {
        /// Exchange symbols to monitor, e.g. ETH SOL
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// Run the pre-trade risk checks against live data
    Validate {
        /// Network (ethereum, solana)
        #[arg(short, long)]
        network: String,

        /// Trade direction (buy, sell)
        #[arg(short, long)]
        side: String,

        /// Token being traded (price index asset id)
        #[arg(short, long)]
        token: String,

        /// Amount in native-asset units
        #[arg(short, long)]
        amount: String,

        /// Unit price in USD
        #[arg(short, long)]
        price: String,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };

    let agent = TradeAiPlugin::new(config);

    match cli.command {
        Commands::Trade {
            network,
            side,
            token,
            amount,
            price,
        } => {
            let result = agent
                .invoke(
                    ACTION_EXECUTE_TRADE,
                    json!({
                        "network": network,
                        "side": side,
                        "token": token,
                        "amount": amount,
                        "price": price,
                    }),
                )
                .await?;
            print_json(&result);
        }

        Commands::MarketData { token } => {
            let result = agent
                .invoke(ACTION_GET_MARKET_DATA, json!({ "token": token }))
                .await?;
            print_json(&result);
        }

        Commands::Portfolio { network } => {
            let result = agent
                .invoke(ACTION_GET_PORTFOLIO, json!({ "network": network }))
                .await?;
            print_json(&result);
        }

        Commands::Strategy {
            id,
            name,
            description,
            parameters,
            active,
        } => {
            let parameters: serde_json::Value = match parameters {
                Some(text) => serde_json::from_str(&text)
                    .map_err(|e| Error::Validation(format!("invalid parameters JSON: {e}")))?,
                None => json!({}),
            };

            let result = agent
                .invoke(
                    ACTION_SET_TRADING_STRATEGY,
                    json!({
                        "id": id,
                        "name": name,
                        "description": description,
                        "parameters": parameters,
                        "active": active,
                    }),
                )
                .await?;
            print_json(&result);
        }

        Commands::Monitor { tokens } => {
            run_monitor(&agent, tokens).await?;
        }

        Commands::Validate {
            network,
            side,
            token,
            amount,
            price,
        } => {
            let request = tradeai::TradeRequest {
                network: network.parse()?,
                side: side.parse()?,
                token,
                amount,
                price,
            };

            let approved = agent.risk().validate_trade(&request).await;
            print_json(&json!({ "approved": approved }));
        }

        Commands::Config => {
            print_json(&serde_json::to_value(agent.config())?);
        }
    }

    Ok(())
}

/// Open the feeds, subscribe to each token, and stream ticks until ctrl-c.
async fn run_monitor(agent: &TradeAiPlugin, tokens: Vec<String>) -> Result<()> {
    let result = agent
        .invoke(ACTION_MONITOR_MARKET, json!({ "tokens": tokens }))
        .await?;
    print_json(&result);

    for token in &tokens {
        let (_id, mut updates) = agent.market().subscribe_to_price_updates(token).await;
        tokio::spawn(async move {
            while let Some(data) = updates.recv().await {
                if let Ok(line) = serde_json::to_string(&data) {
                    println!("{line}");
                }
            }
        });
    }

    tracing::info!("Streaming ticks; press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Config(format!("failed to wait for ctrl-c: {e}")))?;

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
