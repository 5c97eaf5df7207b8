//! Per-token exchange WebSocket feed
//!
//! One task per monitored token. The task connects to the exchange's 24h
//! ticker stream, forwards frames to subscribers, answers pings, and exits
//! on error or close, removing its own connection record. There is no
//! reconnect: a dropped feed requires another monitor call. Subscribers stay
//! registered across connection loss.

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::SubscriberRegistry;
use crate::error::{Error, Result};
use crate::types::MarketData;

/// How often to send ping frames
const PING_INTERVAL_SECS: u64 = 30;

/// Exchange 24h ticker frame (only the fields we consume)
#[derive(Debug, Deserialize)]
struct TickerFrame {
    #[serde(rename = "s")]
    symbol: String,
    /// Last price
    #[serde(rename = "c")]
    last_price: String,
    /// 24h traded base-asset volume
    #[serde(rename = "v")]
    volume: String,
    /// 24h price change
    #[serde(rename = "p")]
    price_change: String,
}

impl TickerFrame {
    fn into_market_data(self, token: &str) -> MarketData {
        MarketData {
            token: token.to_string(),
            price: self.last_price,
            volume_24h: self.volume,
            change_24h: self.price_change,
            timestamp: Utc::now(),
        }
    }
}

pub(super) async fn run_feed(
    token: String,
    stream_url: String,
    registry: Arc<SubscriberRegistry>,
    feeds: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
    connect_timeout: Duration,
) {
    match connect_and_stream(&token, &stream_url, &registry, connect_timeout).await {
        Ok(()) => tracing::info!(token = %token, "Market feed closed"),
        Err(e) => tracing::error!(token = %token, error = %e, "Market feed terminated"),
    }

    // Drop the connection record so a later monitor call can reopen the
    // feed. The subscriber list is left intact.
    feeds.write().await.remove(&token);
}

async fn connect_and_stream(
    token: &str,
    stream_url: &str,
    registry: &SubscriberRegistry,
    connect_timeout: Duration,
) -> Result<()> {
    tracing::info!(token, url = stream_url, "Connecting to exchange stream");

    let (ws_stream, _) = tokio::time::timeout(connect_timeout, connect_async(stream_url))
        .await
        .map_err(|_| Error::Upstream(format!("exchange stream connection timeout for {token}")))??;

    tracing::info!(token, "Exchange stream live");

    let (mut write, mut read) = ws_stream.split();
    let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(token, &text, registry).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(token, "Exchange stream sent close frame");
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(e.into());
                    }
                    None => {
                        return Ok(());
                    }
                    _ => {}
                }
            }
            _ = ping_interval.tick() => {
                write.send(Message::Ping(Vec::new())).await?;
            }
        }
    }
}

async fn handle_frame(token: &str, text: &str, registry: &SubscriberRegistry) {
    match serde_json::from_str::<TickerFrame>(text) {
        Ok(frame) => {
            tracing::trace!(token, symbol = %frame.symbol, price = %frame.last_price, "Tick");
            registry.publish(token, frame.into_market_data(token)).await;
        }
        Err(_) => {
            tracing::debug!(token, "Ignoring unrecognized stream frame");
        }
    }
}
