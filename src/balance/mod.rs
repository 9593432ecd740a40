//! Balance monitor
//!
//! One poller per process feeds the latest `{balance, currency}` to every
//! subscriber through a watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::api::{BackendClient, BalanceData};
use crate::error::{ClientError, ClientResult};

/// What balance consumers see
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceState {
    /// Last good reading; kept when a later poll fails
    pub data: Option<BalanceData>,
    /// True until the first poll finishes
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for BalanceState {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }
}

pub struct BalanceMonitor {
    client: BackendClient,
    interval: Duration,
    tx: watch::Sender<BalanceState>,
    started: AtomicBool,
}

impl BalanceMonitor {
    pub fn new(client: BackendClient, interval: Duration) -> Arc<Self> {
        let (tx, _) = watch::channel(BalanceState::default());
        Arc::new(Self {
            client,
            interval,
            tx,
            started: AtomicBool::new(false),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> BalanceState {
        self.tx.borrow().clone()
    }

    /// Poll once and publish the outcome
    pub async fn refresh(&self) -> ClientResult<BalanceData> {
        let result = self.fetch().await;
        self.tx.send_modify(|state| {
            state.loading = false;
            match &result {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.error = None;
                }
                Err(e) => state.error = Some(e.to_string()),
            }
        });
        if let Err(e) = &result {
            error!(error = %e, "Balance fetch error");
        }
        result
    }

    async fn fetch(&self) -> ClientResult<BalanceData> {
        let user_id = self
            .client
            .session()
            .current()
            .user_id()
            .ok_or(ClientError::NoSession("User ID not found"))?;
        let data = self.client.get_balance(&user_id).await?;
        debug!(user_id = %user_id, balance = data.balance, currency = %data.currency, "Balance updated");
        Ok(data)
    }

    /// Start the poller. Later calls return `None`; the first poller serves
    /// every subscriber.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let monitor = Arc::clone(self);
        info!(interval_ms = monitor.interval.as_millis() as u64, "💰 Balance poller started");
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let _ = monitor.refresh().await;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionHandle};

    fn monitor(session: Session) -> Arc<BalanceMonitor> {
        let client = BackendClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(200),
            SessionHandle::ephemeral(session),
        )
        .unwrap();
        BalanceMonitor::new(client, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn missing_user_is_reported() {
        let monitor = monitor(Session::default());
        let err = monitor.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::NoSession(_)));

        let state = monitor.current();
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("No active session: User ID not found"));
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn only_one_poller() {
        let monitor = monitor(Session::default());
        let first = monitor.start();
        assert!(first.is_some());
        assert!(monitor.start().is_none());
        first.unwrap().abort();
    }
}
