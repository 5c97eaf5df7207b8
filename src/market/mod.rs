//! Market data feed
//!
//! Pull quotes come from a CoinGecko-style price index over HTTP; push
//! updates come from one exchange WebSocket stream per monitored token.
//! Subscribers register per token and receive ticks over their own channel,
//! so a slow subscriber delays only itself; delivery per token is in
//! registration order.

mod feed;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::MarketData;

/// Price index REST endpoint
const PRICE_INDEX_API: &str = "https://api.coingecko.com/api/v3";

/// Exchange streaming endpoint
const EXCHANGE_WS: &str = "wss://stream.binance.com:9443/ws";

/// Handle identifying one registered subscriber.
pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<MarketData>,
}

/// Per-token subscriber lists, owned by the service instance.
pub(crate) struct SubscriberRegistry {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    async fn subscribe(&self, token: &str) -> (SubscriberId, mpsc::UnboundedReceiver<MarketData>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.write().await;
        subscribers
            .entry(token.to_string())
            .or_default()
            .push(Subscriber { id, tx });

        (id, rx)
    }

    async fn unsubscribe(&self, token: &str, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.get_mut(token) {
            Some(list) => {
                let before = list.len();
                list.retain(|s| s.id != id);
                before != list.len()
            }
            None => false,
        }
    }

    /// Deliver one tick to every subscriber for the token, in registration
    /// order. Subscribers whose receiver was dropped are pruned here.
    pub(crate) async fn publish(&self, token: &str, data: MarketData) {
        let mut subscribers = self.subscribers.write().await;
        if let Some(list) = subscribers.get_mut(token) {
            list.retain(|s| s.tx.send(data.clone()).is_ok());
        }
    }
}

/// One entry of the price index `/simple/price` response.
#[derive(Debug, Deserialize)]
struct PriceEntry {
    usd: Option<f64>,
    usd_24h_vol: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// Shape a price index entry into a quote. A missing field means the index
/// does not know the asset, which callers see as an upstream failure.
fn market_data_from_entry(token: &str, entry: &PriceEntry) -> Result<MarketData> {
    let price = entry
        .usd
        .ok_or_else(|| Error::Upstream(format!("price index has no usd price for {token}")))?;
    let volume = entry
        .usd_24h_vol
        .ok_or_else(|| Error::Upstream(format!("price index has no 24h volume for {token}")))?;
    let change = entry
        .usd_24h_change
        .ok_or_else(|| Error::Upstream(format!("price index has no 24h change for {token}")))?;

    Ok(MarketData {
        token: token.to_string(),
        price: price.to_string(),
        volume_24h: volume.to_string(),
        change_24h: change.to_string(),
        timestamp: Utc::now(),
    })
}

/// Point-in-time quotes plus live push subscriptions.
pub struct MarketDataService {
    http: Client,
    api_base: String,
    ws_base: String,
    connect_timeout: Duration,
    registry: Arc<SubscriberRegistry>,
    feeds: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
}

impl MarketDataService {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoints(config, PRICE_INDEX_API, EXCHANGE_WS)
    }

    /// Point the service at alternative endpoints (proxies, test doubles).
    pub fn with_endpoints(config: &Config, api_base: &str, ws_base: &str) -> Self {
        let connect_timeout = Duration::from_millis(config.trading.timeout_ms);
        let http = Client::builder()
            .timeout(connect_timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            ws_base: ws_base.trim_end_matches('/').to_string(),
            connect_timeout,
            registry: Arc::new(SubscriberRegistry::new()),
            feeds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch a point-in-time quote for the given price index asset id.
    pub async fn get_market_data(&self, token: &str) -> Result<MarketData> {
        let url = format!("{}/simple/price", self.api_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("ids", token),
                ("vs_currencies", "usd"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let mut body: HashMap<String, PriceEntry> = response.json().await?;
        let entry = body
            .remove(token)
            .ok_or_else(|| Error::Upstream(format!("price index has no entry for {token}")))?;

        let data = market_data_from_entry(token, &entry)?;
        tracing::debug!(token, price = %data.price, "Fetched market data");
        Ok(data)
    }

    /// Open one push feed per token not already live. Idempotent.
    pub async fn monitor_market(&self, tokens: &[String]) -> Result<()> {
        for token in tokens {
            self.ensure_feed(token).await;
        }
        Ok(())
    }

    async fn ensure_feed(&self, token: &str) {
        let mut feeds = self.feeds.write().await;
        if let Some(handle) = feeds.get(token) {
            if !handle.is_finished() {
                tracing::debug!(token, "Feed already live");
                return;
            }
        }

        let stream_url = format!("{}/{}usdt@ticker", self.ws_base, token.to_lowercase());
        let handle = tokio::spawn(feed::run_feed(
            token.to_string(),
            stream_url,
            Arc::clone(&self.registry),
            Arc::clone(&self.feeds),
            self.connect_timeout,
        ));
        feeds.insert(token.to_string(), handle);
    }

    /// Register a subscriber for a token's ticks. Multiple subscribers per
    /// token are fine; each gets its own channel.
    pub async fn subscribe_to_price_updates(
        &self,
        token: &str,
    ) -> (SubscriberId, mpsc::UnboundedReceiver<MarketData>) {
        self.registry.subscribe(token).await
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub async fn unsubscribe_from_price_updates(&self, token: &str, id: SubscriberId) -> bool {
        self.registry.unsubscribe(token, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data(token: &str, price: &str) -> MarketData {
        MarketData {
            token: token.to_string(),
            price: price.to_string(),
            volume_24h: "0".to_string(),
            change_24h: "0".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn entry_maps_to_stringified_quote() {
        let entry = PriceEntry {
            usd: Some(50000.0),
            usd_24h_vol: Some(1e9),
            usd_24h_change: Some(2.5),
        };

        let before = Utc::now();
        let data = market_data_from_entry("bitcoin", &entry).unwrap();

        assert_eq!(data.token, "bitcoin");
        assert_eq!(data.price, "50000");
        assert_eq!(data.volume_24h, "1000000000");
        assert_eq!(data.change_24h, "2.5");
        assert!(data.timestamp >= before && data.timestamp <= Utc::now());
    }

    #[test]
    fn entry_missing_fields_is_upstream_error() {
        let entry = PriceEntry {
            usd: Some(50000.0),
            usd_24h_vol: None,
            usd_24h_change: Some(2.5),
        };

        let err = market_data_from_entry("bitcoin", &entry).unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn subscribers_receive_ticks_in_registration_order() {
        let registry = SubscriberRegistry::new();
        let (_first, mut rx_first) = registry.subscribe("ETH").await;
        let (_second, mut rx_second) = registry.subscribe("ETH").await;

        registry.publish("ETH", sample_data("ETH", "2000")).await;

        assert_eq!(rx_first.recv().await.unwrap().price, "2000");
        assert_eq!(rx_second.recv().await.unwrap().price, "2000");
    }

    #[tokio::test]
    async fn unsubscribed_listener_gets_no_further_ticks() {
        let registry = SubscriberRegistry::new();
        let (id, mut rx) = registry.subscribe("ETH").await;

        registry.publish("ETH", sample_data("ETH", "2000")).await;
        assert!(rx.recv().await.is_some());

        assert!(registry.unsubscribe("ETH", id).await);
        registry.publish("ETH", sample_data("ETH", "2100")).await;

        // Channel is closed once the sender side is dropped by unsubscribe.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_unknown_listener_is_noop() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.unsubscribe("ETH", 42).await);
    }

    #[tokio::test]
    async fn publish_only_reaches_matching_token() {
        let registry = SubscriberRegistry::new();
        let (_id, mut rx) = registry.subscribe("SOL").await;

        registry.publish("ETH", sample_data("ETH", "2000")).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_publish() {
        let registry = SubscriberRegistry::new();
        let (_id, rx) = registry.subscribe("ETH").await;
        drop(rx);

        registry.publish("ETH", sample_data("ETH", "2000")).await;

        let subscribers = registry.subscribers.read().await;
        assert!(subscribers.get("ETH").map(Vec::is_empty).unwrap_or(true));
    }
}
