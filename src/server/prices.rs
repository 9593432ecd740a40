//! /api/prices proxy handler

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::{ApiError, ServerState};
use crate::oracle::{fallback, PriceData};
use crate::types::Coin;

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pair: Option<String>,
}

/// GET /api/prices?pair=btc
pub async fn get_price(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceData>, ApiError> {
    let pair_id = query.pair.unwrap_or_default();
    let coin = Coin::from_pair_id(&pair_id).ok_or_else(|| ApiError::bad_request("Invalid pair ID"))?;

    let data = match state.coinmarketcap.detail(coin).await {
        Ok(Some(data)) => data,
        Ok(None) => fallback::synthetic_quote(fallback::price_by_pair_id(&pair_id)),
        Err(e) => {
            error!(pair = %pair_id, error = %e, "Price API error");
            fallback::emergency_quote(&pair_id)
        }
    };
    Ok(Json(data))
}
