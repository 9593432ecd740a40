//! CoinGecko simple-price client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{synthesized_quote, QuoteProvider};
use crate::oracle::PriceData;
use crate::types::Coin;

#[derive(Debug, Clone, Default, Deserialize)]
struct SimplePrice {
    #[serde(default)]
    usd: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

type SimplePriceResponse = HashMap<String, SimplePrice>;

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
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

    /// None when CoinGecko answered with a non-success status
    async fn simple_price(&self, ids: &str) -> Result<Option<SimplePriceResponse>> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .context("Failed to reach CoinGecko")?;

        if !response.status().is_success() {
            debug!(ids = %ids, status = %response.status(), "CoinGecko declined");
            return Ok(None);
        }

        let body = response
            .json()
            .await
            .context("Failed to parse CoinGecko response")?;
        Ok(Some(body))
    }
}

/// Synthesized quote when CoinGecko reports a positive price
fn to_quote(entry: Option<&SimplePrice>) -> Option<PriceData> {
    let entry = entry?;
    let price = entry.usd.unwrap_or(0.0);
    if price <= 0.0 {
        return None;
    }
    Some(synthesized_quote(price, entry.usd_24h_change.unwrap_or(0.0), 0.0))
}

#[async_trait]
impl QuoteProvider for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn quote(&self, pair_id: &str) -> Result<Option<PriceData>> {
        let gecko_id = Coin::coingecko_id_for(pair_id);
        let Some(body) = self.simple_price(&gecko_id).await? else {
            return Ok(None);
        };
        let quote = to_quote(body.get(&gecko_id));
        if let Some(q) = &quote {
            debug!(pair = %pair_id, price = q.price, "CoinGecko fallback success");
        }
        Ok(quote)
    }

    /// One batch request for every pair
    async fn quotes(&self, pair_ids: &[String]) -> Result<HashMap<String, PriceData>> {
        let ids = pair_ids
            .iter()
            .map(|id| Coin::coingecko_id_for(id))
            .collect::<Vec<_>>()
            .join(",");
        let Some(body) = self.simple_price(&ids).await? else {
            return Ok(HashMap::new());
        };
        Ok(pair_ids
            .iter()
            .filter_map(|pair_id| {
                let quote = to_quote(body.get(&Coin::coingecko_id_for(pair_id)))?;
                Some((pair_id.clone(), quote))
            })
            .collect())
    }
}
