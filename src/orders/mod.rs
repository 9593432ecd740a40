//! Orders
//!
//! Backend orders for the current user, normalized into one shape and merged
//! with optimistic local orders that the backend has not confirmed yet.

mod book;
mod normalize;

pub use book::{OrdersBook, OrdersSnapshot};
pub use normalize::{
    coerce_number, generate_order_id, infer_loss_from_settlement, merge_orders, normalize_order,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::BackendClient;
use crate::error::ClientResult;
use crate::types::{Direction, OrderOrigin, OrderResult, OrderStatus, TradeType};

/// A trade as shown in order history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub user_id: Option<String>,
    pub pair: String,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    pub status: OrderStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_loss_expected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_loss_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OrderResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_payout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_loss_amount: Option<f64>,
    pub origin: OrderOrigin,
}

/// Input for an optimistic local order. Id, timestamp and origin are
/// generated unless supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewOrder {
    pub id: Option<String>,
    pub created_at: Option<String>,
    pub origin: Option<OrderOrigin>,
    pub user_id: Option<String>,
    pub pair: String,
    pub amount: f64,
    pub currency: String,
    pub trade_type: TradeType,
    pub direction: Option<Direction>,
    pub status: OrderStatus,
    pub price: Option<f64>,
    pub duration: Option<String>,
    pub forced_loss_expected: Option<bool>,
    pub loss_percent: Option<f64>,
    pub expected_loss_amount: Option<f64>,
}

/// Where the orders book pulls backend orders from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrdersSource: Send + Sync {
    /// Raw order records for a user; `None` when the backend answered 304
    async fn fetch_orders(&self, user_id: &str) -> ClientResult<Option<Vec<Value>>>;
}

#[async_trait]
impl OrdersSource for BackendClient {
    async fn fetch_orders(&self, user_id: &str) -> ClientResult<Option<Vec<Value>>> {
        self.fetch_user_orders(user_id).await
    }
}
