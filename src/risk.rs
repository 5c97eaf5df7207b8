//! Risk evaluation
//!
//! Three pre-trade checks (position size, portfolio exposure, volatility)
//! plus per-token stop-loss / take-profit thresholds. `validate_trade` is
//! fail-closed: any error during evaluation rejects the trade instead of
//! surfacing to the caller.
//!
//! The exposure check reads the live portfolio and decides without any
//! lock, so concurrent validations can race against the same stale total.
//! `check_risk_levels` is a pure evaluation over caller-supplied prices;
//! nothing here polls the feed.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::RiskConfig;
use crate::error::{Error, Result};
use crate::market::MarketDataService;
use crate::portfolio::PortfolioService;
use crate::types::{TradeRequest, TradeSide};

/// Largest share of the portfolio's total value a single trade may take.
const MAX_EXPOSURE_FRACTION: f64 = 0.2;

/// Largest tolerated absolute 24h price change, in percent.
const MAX_CHANGE_24H_PERCENT: f64 = 10.0;

/// A stop-loss or take-profit level for one token.
#[derive(Debug, Clone, Copy)]
pub struct RiskThreshold {
    pub price: f64,
    pub side: TradeSide,
}

impl RiskThreshold {
    /// A stop-loss fires when price moves against the position: at or below
    /// the level for a long, at or above it for a short.
    fn stop_loss_triggered(&self, current_price: f64) -> bool {
        match self.side {
            TradeSide::Buy => current_price <= self.price,
            TradeSide::Sell => current_price >= self.price,
        }
    }

    /// A take-profit fires in the opposite direction.
    fn take_profit_triggered(&self, current_price: f64) -> bool {
        match self.side {
            TradeSide::Buy => current_price >= self.price,
            TradeSide::Sell => current_price <= self.price,
        }
    }
}

/// Trigger state for one token at a given price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLevels {
    pub stop_loss_triggered: bool,
    pub take_profit_triggered: bool,
}

pub struct RiskManager {
    config: RiskConfig,
    portfolio: Arc<PortfolioService>,
    market: Arc<MarketDataService>,
    stop_losses: RwLock<HashMap<String, RiskThreshold>>,
    take_profits: RwLock<HashMap<String, RiskThreshold>>,
}

impl RiskManager {
    pub fn new(
        config: RiskConfig,
        portfolio: Arc<PortfolioService>,
        market: Arc<MarketDataService>,
    ) -> Self {
        Self {
            config,
            portfolio,
            market,
            stop_losses: RwLock::new(HashMap::new()),
            take_profits: RwLock::new(HashMap::new()),
        }
    }

    /// Decide whether a trade may proceed. Never errors: evaluation
    /// failures reject the trade.
    pub async fn validate_trade(&self, trade: &TradeRequest) -> bool {
        match self.try_validate(trade).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(token = %trade.token, error = %e, "Trade validation errored, rejecting");
                false
            }
        }
    }

    async fn try_validate(&self, trade: &TradeRequest) -> Result<bool> {
        // Cheapest check first; the others each cost an upstream call.
        let amount = parse_decimal(&trade.amount, "amount")?;
        if !position_size_ok(amount, self.config.max_position_size) {
            tracing::info!(
                token = %trade.token,
                amount,
                max_position_size = self.config.max_position_size,
                "Trade exceeds max position size"
            );
            return Ok(false);
        }

        let price = parse_decimal(&trade.price, "price")?;
        let portfolio = self.portfolio.get_portfolio(trade.network).await?;
        let total_value = parse_decimal(&portfolio.total_value, "portfolio total value")?;
        if !exposure_ok(amount * price, total_value) {
            tracing::info!(
                token = %trade.token,
                notional = amount * price,
                total_value,
                "Trade exceeds portfolio exposure cap"
            );
            return Ok(false);
        }

        let quote = self.market.get_market_data(&trade.token).await?;
        let change = parse_decimal(&quote.change_24h, "24h change")?;
        if !volatility_ok(change) {
            tracing::info!(token = %trade.token, change_24h = change, "Market too volatile to trade");
            return Ok(false);
        }

        Ok(true)
    }

    /// Upsert the stop-loss level for a token. Last write wins.
    pub async fn set_stop_loss(&self, token: &str, price: f64, side: TradeSide) {
        let mut stop_losses = self.stop_losses.write().await;
        stop_losses.insert(token.to_string(), RiskThreshold { price, side });
        tracing::info!(token, price, side = %side, "Stop-loss set");
    }

    /// Upsert the take-profit level for a token. Last write wins.
    pub async fn set_take_profit(&self, token: &str, price: f64, side: TradeSide) {
        let mut take_profits = self.take_profits.write().await;
        take_profits.insert(token.to_string(), RiskThreshold { price, side });
        tracing::info!(token, price, side = %side, "Take-profit set");
    }

    /// Evaluate the recorded thresholds for a token against a price supplied
    /// by the caller.
    pub async fn check_risk_levels(&self, token: &str, current_price: f64) -> RiskLevels {
        let stop_loss = self.stop_losses.read().await.get(token).copied();
        let take_profit = self.take_profits.read().await.get(token).copied();

        RiskLevels {
            stop_loss_triggered: stop_loss
                .map(|t| t.stop_loss_triggered(current_price))
                .unwrap_or(false),
            take_profit_triggered: take_profit
                .map(|t| t.take_profit_triggered(current_price))
                .unwrap_or(false),
        }
    }
}

fn parse_decimal(text: &str, what: &str) -> Result<f64> {
    text.trim()
        .parse()
        .map_err(|_| Error::Validation(format!("unparseable {what}: {text}")))
}

fn position_size_ok(amount: f64, max_position_size: f64) -> bool {
    amount <= max_position_size
}

fn exposure_ok(notional: f64, total_value: f64) -> bool {
    notional <= total_value * MAX_EXPOSURE_FRACTION
}

fn volatility_ok(change_24h: f64) -> bool {
    change_24h.abs() <= MAX_CHANGE_24H_PERCENT
}
