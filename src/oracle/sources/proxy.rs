//! Local price proxy client (`GET /api/prices?pair=`)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::QuoteProvider;
use crate::oracle::PriceData;

#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
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
}

#[async_trait]
impl QuoteProvider for ProxyClient {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn quote(&self, pair_id: &str) -> Result<Option<PriceData>> {
        let url = format!("{}/api/prices", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("pair", pair_id)])
            .send()
            .await
            .context("Failed to reach price proxy")?;

        if !response.status().is_success() {
            debug!(pair = %pair_id, status = %response.status(), "Price proxy declined");
            return Ok(None);
        }

        let data: PriceData = response
            .json()
            .await
            .context("Failed to parse price proxy response")?;
        debug!(pair = %pair_id, price = data.price, "Price proxy success");
        Ok(Some(data))
    }
}
