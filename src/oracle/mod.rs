//! Oracle module - layered price lookup
//!
//! Asks each quote provider in turn (local proxy, then CoinGecko) and falls
//! back to a static reference table. A transport failure anywhere in the
//! chain short-circuits to the emergency table instead.

pub mod fallback;
pub mod sources;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use sources::{CoinGeckoClient, ProxyClient, QuoteProvider};

/// Price and 24h statistics for one pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Ordered provider chain with static fallbacks
pub struct PriceService {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl PriceService {
    pub fn new(providers: Vec<Box<dyn QuoteProvider>>) -> Self {
        Self { providers }
    }

    /// Proxy first, then CoinGecko
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        Ok(Self::new(vec![
            Box::new(ProxyClient::new(&config.prices.proxy_url, timeout)?),
            Box::new(CoinGeckoClient::new(&config.prices.coingecko_url, timeout)?),
        ]))
    }

    /// Quote for one pair. Never fails; the static tables cover every miss.
    pub async fn fetch_crypto_price(&self, pair_id: &str) -> PriceData {
        for provider in &self.providers {
            match provider.quote(pair_id).await {
                Ok(Some(data)) => return data,
                Ok(None) => {
                    debug!(source = provider.name(), pair = %pair_id, "No usable quote, trying next tier");
                }
                Err(e) => {
                    error!(source = provider.name(), pair = %pair_id, error = %e, "Error fetching price");
                    return fallback::emergency_quote(pair_id);
                }
            }
        }
        let data = fallback::table_quote(pair_id);
        info!(pair = %pair_id, price = data.price, "Using fallback price");
        data
    }

    /// Quotes for several pairs. The first tier that yields anything wins;
    /// otherwise every pair gets a table price.
    pub async fn fetch_multiple_prices(&self, pair_ids: &[String]) -> HashMap<String, PriceData> {
        for provider in &self.providers {
            match provider.quotes(pair_ids).await {
                Ok(found) if !found.is_empty() => {
                    debug!(source = provider.name(), count = found.len(), "Batch prices");
                    return found;
                }
                Ok(_) => {}
                Err(e) => warn!(source = provider.name(), error = %e, "Batch price fetch failed"),
            }
        }
        info!(count = pair_ids.len(), "Using fallback prices");
        pair_ids
            .iter()
            .map(|id| (id.clone(), fallback::batch_table_quote(id)))
            .collect()
    }
}

/// Periodically refreshed prices for a fixed set of pairs
pub struct PriceTicker {
    service: Arc<PriceService>,
    pair_ids: Vec<String>,
    interval: Duration,
    tx: watch::Sender<HashMap<String, PriceData>>,
}

impl PriceTicker {
    pub fn new(service: Arc<PriceService>, pair_ids: Vec<String>, interval: Duration) -> Arc<Self> {
        let (tx, _) = watch::channel(HashMap::new());
        Arc::new(Self {
            service,
            pair_ids,
            interval,
            tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<HashMap<String, PriceData>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> HashMap<String, PriceData> {
        self.tx.borrow().clone()
    }

    /// Fetch once and publish
    pub async fn refresh(&self) -> HashMap<String, PriceData> {
        let prices = self.service.fetch_multiple_prices(&self.pair_ids).await;
        self.tx.send_replace(prices.clone());
        prices
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let ticker = Arc::clone(self);
        info!(pairs = ticker.pair_ids.len(), interval_secs = ticker.interval.as_secs(), "📈 Price ticker started");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ticker.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticker.refresh().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Declines;
    struct Fails;
    struct Fixed(f64);

    #[async_trait]
    impl QuoteProvider for Declines {
        fn name(&self) -> &'static str {
            "declines"
        }
        async fn quote(&self, _pair_id: &str) -> Result<Option<PriceData>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl QuoteProvider for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }
        async fn quote(&self, _pair_id: &str) -> Result<Option<PriceData>> {
            anyhow::bail!("connection refused")
        }
    }

    #[async_trait]
    impl QuoteProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn quote(&self, _pair_id: &str) -> Result<Option<PriceData>> {
            Ok(Some(PriceData {
                price: self.0,
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn first_answer_wins() {
        let service = PriceService::new(vec![Box::new(Declines), Box::new(Fixed(42.0))]);
        assert_eq!(service.fetch_crypto_price("btc").await.price, 42.0);
    }

    #[tokio::test]
    async fn all_declining_uses_table() {
        let service = PriceService::new(vec![Box::new(Declines), Box::new(Declines)]);
        let data = service.fetch_crypto_price("btc").await;
        assert_eq!(data.price, 98_000.0);
        assert_eq!(data.high, 98_000.0 * 1.05);
    }

    #[tokio::test]
    async fn failure_short_circuits_to_emergency() {
        let service = PriceService::new(vec![Box::new(Fails), Box::new(Fixed(1.0))]);
        let data = service.fetch_crypto_price("eth").await;
        assert_eq!(data.price, 3_500.0);
        assert_eq!(data.high, 0.0);
        assert_eq!(data.change, 0.0);
    }

    #[tokio::test]
    async fn batch_falls_through_to_table() {
        let service = PriceService::new(vec![Box::new(Fails), Box::new(Declines)]);
        let pairs = vec!["btc".to_string(), "unknown".to_string()];
        let prices = service.fetch_multiple_prices(&pairs).await;
        assert_eq!(prices["btc"].price, 98_000.0);
        assert_eq!(prices["unknown"].price, 100.0);
        assert_eq!(prices["btc"].high, 0.0);
    }

    #[tokio::test]
    async fn ticker_publishes() {
        let service = Arc::new(PriceService::new(vec![Box::new(Fixed(7.0))]));
        let ticker = PriceTicker::new(service, vec!["doge".into()], Duration::from_secs(30));
        let mut rx = ticker.subscribe();
        ticker.refresh().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()["doge"].price, 7.0);
    }
}
