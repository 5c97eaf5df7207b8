//! tradeai
//!
//! An on-chain trading plugin for AI agent hosts. Exposes five named
//! actions (execute trade, get market data, get portfolio, set trading
//! strategy, monitor market) over Ethereum and Solana, backed by a price
//! index HTTP API and exchange WebSocket streams.
//!
//! # Security Model
//!
//! - The trading key is read from the environment, parsed only inside the
//!   wallet module, and never serialized or logged
//! - Pre-trade risk checks are fail-closed: an evaluation error rejects the
//!   trade instead of surfacing
//! - Trade submission is fire-and-forget: no confirmation is awaited and no
//!   state is persisted beyond the returned record

pub mod config;
pub mod market;
pub mod plugin;
pub mod portfolio;
pub mod risk;
pub mod trading;
pub mod types;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use plugin::{PluginAction, TradeAiPlugin};
pub use types::{
    MarketData, Network, Portfolio, Trade, TradeRequest, TradeSide, TradingStrategy,
};
