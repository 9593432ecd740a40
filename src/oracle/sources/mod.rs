//! Quote providers (local proxy, CoinGecko, CoinMarketCap)

mod coingecko;
mod coinmarketcap;
mod proxy;

pub use coingecko::CoinGeckoClient;
pub use coinmarketcap::CoinMarketCapClient;
pub use proxy::ProxyClient;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::HashMap;
use tracing::debug;

use super::PriceData;

/// One tier of the price chain.
///
/// `Ok(None)` means the provider answered but had nothing usable, so the
/// chain moves on. `Err` means the request itself failed.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Quote for a short pair id such as "btc"
    async fn quote(&self, pair_id: &str) -> Result<Option<PriceData>>;

    /// Quotes for several pairs; pairs without a usable quote are omitted
    async fn quotes(&self, pair_ids: &[String]) -> Result<HashMap<String, PriceData>> {
        let results = join_all(pair_ids.iter().map(|id| self.quote(id))).await;
        let mut out = HashMap::new();
        for (pair_id, result) in pair_ids.iter().zip(results) {
            match result {
                Ok(Some(data)) => {
                    out.insert(pair_id.clone(), data);
                }
                Ok(None) => {}
                Err(e) => debug!(source = self.name(), pair = %pair_id, error = %e, "Quote failed"),
            }
        }
        Ok(out)
    }
}

/// Quote synthesized from a spot price and 24h change
pub fn synthesized_quote(price: f64, change: f64, volume: f64) -> PriceData {
    PriceData {
        price,
        change,
        high: price * 1.05,
        low: price * 0.95,
        open: price * (1.0 - change / 100.0),
        close: price,
        volume,
    }
}
