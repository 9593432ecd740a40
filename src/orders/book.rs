//! Shared orders state

use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info};

use super::normalize::{generate_order_id, merge_orders, normalize_order, now_rfc3339};
use super::{NewOrder, OrderItem, OrdersSource};
use crate::session::Session;
use crate::types::{OrderOrigin, OrderStatus};

/// Point-in-time copy of the book
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersSnapshot {
    pub orders: Vec<OrderItem>,
    /// True until the first refresh finishes
    pub loading: bool,
    /// True while a refresh is in flight
    pub syncing: bool,
}

/// Order collection shared by every consumer in the process
pub struct OrdersBook {
    state: RwLock<OrdersSnapshot>,
    version: watch::Sender<u64>,
}

impl Default for OrdersBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrdersBook {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(OrdersSnapshot {
                orders: Vec::new(),
                loading: true,
                syncing: false,
            }),
            version,
        }
    }

    pub async fn snapshot(&self) -> OrdersSnapshot {
        self.state.read().await.clone()
    }

    pub async fn orders(&self) -> Vec<OrderItem> {
        self.state.read().await.orders.clone()
    }

    pub async fn get(&self, id: &str) -> Option<OrderItem> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }

    /// Bumped after every change to the book
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Reconcile with the backend for the session's user.
    ///
    /// Without a user id the book is cleared and nothing is requested.
    /// Failures are logged and leave the orders untouched.
    pub async fn refresh(&self, source: &dyn OrdersSource, session: &Session) {
        let Some(user_id) = session.user_id() else {
            let mut state = self.state.write().await;
            state.orders.clear();
            state.loading = false;
            drop(state);
            self.notify();
            return;
        };

        self.state.write().await.syncing = true;
        self.notify();

        match source.fetch_orders(&user_id).await {
            Ok(None) => {
                debug!(user_id = %user_id, "Orders not modified");
            }
            Ok(Some(raw)) => {
                let server: Vec<OrderItem> = raw.iter().map(normalize_order).collect();
                let mut state = self.state.write().await;
                let merged = merge_orders(&state.orders, server);
                info!(user_id = %user_id, count = merged.len(), "Orders synced");
                state.orders = merged;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Order fetch failed");
            }
        }

        let mut state = self.state.write().await;
        state.loading = false;
        state.syncing = false;
        drop(state);
        self.notify();
    }

    /// Insert an optimistic order at the front, replacing any entry with the
    /// same id.
    pub async fn add_local_order(&self, order: NewOrder) -> OrderItem {
        let item = OrderItem {
            id: order.id.unwrap_or_else(generate_order_id),
            user_id: order.user_id,
            pair: order.pair,
            amount: order.amount,
            currency: order.currency,
            trade_type: order.trade_type,
            direction: order.direction,
            status: order.status,
            created_at: order.created_at.unwrap_or_else(now_rfc3339),
            updated_at: None,
            price: order.price,
            duration: order.duration,
            forced_loss_expected: order.forced_loss_expected,
            loss_percent: order.loss_percent,
            expected_loss_amount: order.expected_loss_amount,
            result: None,
            settled_payout: None,
            settled_loss_amount: None,
            origin: order.origin.unwrap_or(OrderOrigin::Local),
        };

        let mut state = self.state.write().await;
        state.orders.retain(|o| o.id != item.id);
        state.orders.insert(0, item.clone());
        drop(state);

        debug!(id = %item.id, pair = %item.pair, "Local order added");
        self.notify();
        item
    }

    /// Mark an order completed locally. Returns false for an unknown id.
    pub async fn mark_completed(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(order) = state.orders.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        order.status = OrderStatus::Completed;
        order.updated_at = Some(now_rfc3339());
        drop(state);
        self.notify();
        true
    }
}
