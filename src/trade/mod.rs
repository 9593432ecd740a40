//! Trade ticket
//!
//! Picks a prediction option, validates the stake against its capital range,
//! submits the order and records it locally whatever the backend says.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{BackendClient, PredictionOption};
use crate::error::{ClientError, ClientResult};
use crate::orders::{NewOrder, OrderItem, OrdersBook};
use crate::types::{Direction, OrderStatus};

/// Built-in options when the backend has none configured
pub fn default_options() -> Vec<PredictionOption> {
    [(30, 12.0, 500.0, 5_000.0), (50, 13.0, 5_000.0, 10_000.0), (60, 14.0, 10_000.0, 20_000.0)]
        .into_iter()
        .enumerate()
        .map(|(i, (seconds, return_rate, capital_min, capital_max))| PredictionOption {
            id: format!("default-{}", seconds),
            option_id: None,
            seconds,
            return_rate,
            capital_min,
            capital_max,
            currency: "USDT".to_string(),
            pair: None,
            is_active: true,
            sort_order: i as i64,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .collect()
}

/// What the trader entered
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    /// Display symbol, e.g. "BTC/USDT"
    pub pair: String,
    pub direction: Direction,
    /// Price shown when the trade was placed
    pub price: f64,
    pub seconds: u32,
    /// Raw amount as typed
    pub amount: String,
}

/// Submission result. The order is in the book either way.
#[derive(Debug)]
pub enum TradeOutcome {
    Placed(OrderItem),
    Failed { order: OrderItem, error: ClientError },
}

impl TradeOutcome {
    pub fn order(&self) -> &OrderItem {
        match self {
            TradeOutcome::Placed(order) => order,
            TradeOutcome::Failed { order, .. } => order,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, TradeOutcome::Placed(_))
    }
}

pub struct TradeTicket {
    client: BackendClient,
    orders: Arc<OrdersBook>,
    options: Vec<PredictionOption>,
}

impl TradeTicket {
    pub fn new(client: BackendClient, orders: Arc<OrdersBook>) -> Self {
        Self {
            client,
            orders,
            options: default_options(),
        }
    }

    pub fn with_options(mut self, options: Vec<PredictionOption>) -> Self {
        self.options = options;
        self
    }

    /// Replace the defaults with the backend's active options for a pair.
    /// Keeps the current options when the backend has none or fails.
    pub async fn load_options(&mut self, pair: Option<&str>) {
        match self.client.prediction_options(pair).await {
            Ok(options) => {
                let mut active: Vec<_> = options.into_iter().filter(|o| o.is_active).collect();
                if active.is_empty() {
                    return;
                }
                active.sort_by_key(|o| (o.sort_order, o.seconds));
                self.options = active;
            }
            Err(e) => warn!(error = %e, "Failed to fetch prediction options, keeping defaults"),
        }
    }

    pub fn options(&self) -> &[PredictionOption] {
        &self.options
    }

    pub fn option(&self, seconds: u32) -> Option<&PredictionOption> {
        self.options.iter().find(|o| o.seconds == seconds)
    }

    /// Parsed amount and the option it was checked against
    pub fn validate(&self, seconds: u32, amount: &str) -> ClientResult<(f64, &PredictionOption)> {
        let amount = amount.trim();
        if amount.is_empty() {
            return Err(ClientError::validation("Please enter an amount"));
        }
        let value: f64 = amount
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| ClientError::validation("Please enter a valid amount"))?;
        if value <= 0.0 {
            return Err(ClientError::validation("Amount must be greater than zero"));
        }
        let option = self
            .option(seconds)
            .ok_or_else(|| ClientError::validation(format!("Unknown duration option {}s", seconds)))?;
        if !option.contains(value) {
            return Err(ClientError::validation(format!(
                "Amount must be between {} and {} {} for {}",
                option.capital_min,
                option.capital_max,
                option.currency,
                option.label()
            )));
        }
        Ok((value, option))
    }

    /// Payout on a win for the given stake
    pub fn expected_return(&self, seconds: u32, amount: f64) -> Option<f64> {
        self.option(seconds)
            .map(|o| amount * o.return_rate / 100.0)
    }

    /// Validate, post to /orders and record the order locally.
    ///
    /// Validation and session errors return `Err` with nothing sent or
    /// recorded. A backend failure still records the order.
    pub async fn submit(&self, request: &TradeRequest) -> ClientResult<TradeOutcome> {
        let (amount, option) = self.validate(request.seconds, &request.amount)?;
        let duration = option.label();
        let (_, user_id) = self.client.require_user()?;
        let trade_type = request.direction.trade_type();

        let body = json!({
            "userId": user_id,
            "amount": amount,
            "currency": "USDT",
            "type": trade_type.as_str(),
            "direction": request.direction.to_string(),
        });
        let result = self.client.create_order(&body).await;

        let order = self
            .orders
            .add_local_order(NewOrder {
                user_id: Some(user_id),
                pair: request.pair.clone(),
                amount,
                currency: "USDT".to_string(),
                trade_type,
                direction: Some(request.direction),
                status: OrderStatus::InProgress,
                price: Some(request.price),
                duration: Some(duration),
                ..Default::default()
            })
            .await;

        match result {
            Ok(_) => {
                info!(pair = %request.pair, amount, side = %trade_type, "Order placed successfully");
                Ok(TradeOutcome::Placed(order))
            }
            Err(error) => {
                warn!(pair = %request.pair, error = %error, "Failed to place order, kept locally");
                Ok(TradeOutcome::Failed { order, error })
            }
        }
    }
}
