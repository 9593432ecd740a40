//! CoinMarketCap public detail endpoint, used by the local price proxy

use anyhow::{bail, Context, Result};
use reqwest::{header::USER_AGENT, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::synthesized_quote;
use crate::oracle::PriceData;
use crate::types::Coin;

const CMC_USER_AGENT: &str = "Mozilla/5.0 (compatible; TradeFlow/1.0)";

#[derive(Debug, Default, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    data: Option<DetailData>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailData {
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    price_change_percentage24h: Option<f64>,
    #[serde(default)]
    volume24h: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    client: Client,
    base_url: String,
}

impl CoinMarketCapClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Quote for a coin. `Ok(None)` when CoinMarketCap reports no positive
    /// price; any non-success status is an error.
    pub async fn detail(&self, coin: Coin) -> Result<Option<PriceData>> {
        let url = format!("{}/cryptocurrency/detail", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", coin.coinmarketcap_id())])
            .header(USER_AGENT, CMC_USER_AGENT)
            .send()
            .await
            .context("Failed to reach CoinMarketCap")?;

        if !response.status().is_success() {
            bail!("CoinMarketCap API error: {}", response.status());
        }

        let body: DetailResponse = response
            .json()
            .await
            .context("Failed to parse CoinMarketCap response")?;
        let stats = body.data.and_then(|d| d.statistics).unwrap_or_default();
        let price = stats.price.unwrap_or(0.0);
        if price <= 0.0 {
            return Ok(None);
        }

        debug!(coin = %coin, price, "CoinMarketCap quote");
        Ok(Some(synthesized_quote(
            price,
            stats.price_change_percentage24h.unwrap_or(0.0),
            stats.volume24h.unwrap_or(0.0),
        )))
    }
}
