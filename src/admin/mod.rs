//! Admin console
//!
//! Every panel follows the same contract: load the list, run an action, and
//! on success refetch the whole list. Failures are returned untouched; no
//! local adjustment is made.

mod payments;
mod predictions;
mod tracker;
mod users;
mod withdrawals;

pub use tracker::{ActionGuard, ActionTracker, AdminAction};
pub use users::{filter_users, parse_balance_input, ForceLossOutcome, MIN_PASSWORD_LEN};
pub use predictions::sort_options;
pub use withdrawals::build_approval;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::{AdminOrder, BackendClient, OptionsClient, Stats};
use crate::error::{ClientError, ClientResult};

pub struct AdminConsole {
    client: BackendClient,
    options: OptionsClient,
    tracker: ActionTracker,
    stats: RwLock<Stats>,
}

impl AdminConsole {
    /// Requires a session with the ADMIN role
    pub fn new(client: BackendClient, options: OptionsClient) -> ClientResult<Self> {
        if !client.session().current().is_admin() {
            return Err(ClientError::Forbidden);
        }
        Ok(Self {
            client,
            options,
            tracker: ActionTracker::default(),
            stats: RwLock::new(Stats::default()),
        })
    }

    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    /// Claim the per-entity action slot or fail if one is already running
    fn begin(&self, id: &str, action: AdminAction) -> ClientResult<ActionGuard<'_>> {
        self.tracker.begin(id, action).ok_or_else(|| {
            ClientError::validation(format!("An action is already in progress for {}", id))
        })
    }

    /// Overview counters, loaded concurrently. Each part only changes when
    /// its request succeeded; the rest keep their previous values.
    pub async fn load_stats(&self) -> Stats {
        let (users, payments, transactions) = tokio::join!(
            self.client.list_users(),
            self.client.list_payments(Some("PENDING")),
            self.client.list_transactions(),
        );

        let mut stats = self.stats.write().await;
        match users {
            Ok(users) => {
                stats.total_users = users.len();
                stats.active_users = users.iter().filter(|u| u.is_active).count();
            }
            Err(e) => warn!(error = %e, "Failed to fetch users for stats"),
        }
        match payments {
            Ok(payments) => stats.pending_payments = payments.len(),
            Err(e) => warn!(error = %e, "Failed to fetch pending payments for stats"),
        }
        match transactions {
            Ok(transactions) => stats.recent_transactions = transactions.len(),
            Err(e) => warn!(error = %e, "Failed to fetch transactions for stats"),
        }
        info!(
            total_users = stats.total_users,
            active_users = stats.active_users,
            pending_payments = stats.pending_payments,
            transactions = stats.recent_transactions,
            "Dashboard stats loaded"
        );
        stats.clone()
    }

    /// All orders, read-only
    pub async fn orders(&self) -> ClientResult<Vec<AdminOrder>> {
        self.client.list_all_orders().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionHandle};
    use std::time::Duration;

    fn clients(role: Option<&str>) -> (BackendClient, OptionsClient) {
        let session = SessionHandle::ephemeral(Session {
            token: Some("t".into()),
            user_id: Some("1".into()),
            role: role.map(str::to_string),
            ..Default::default()
        });
        let timeout = Duration::from_millis(200);
        (
            BackendClient::new("http://127.0.0.1:9", timeout, session.clone()).unwrap(),
            OptionsClient::new("http://127.0.0.1:9", timeout, session).unwrap(),
        )
    }

    #[test]
    fn non_admin_is_rejected() {
        let (client, options) = clients(Some("USER"));
        assert!(matches!(
            AdminConsole::new(client, options),
            Err(ClientError::Forbidden)
        ));

        let (client, options) = clients(None);
        assert!(AdminConsole::new(client, options).is_err());

        let (client, options) = clients(Some("ADMIN"));
        assert!(AdminConsole::new(client, options).is_ok());
    }

    #[tokio::test]
    async fn stats_keep_previous_values_on_failure() {
        let (client, options) = clients(Some("ADMIN"));
        let console = AdminConsole::new(client, options).unwrap();
        *console.stats.write().await = Stats {
            total_users: 3,
            ..Default::default()
        };
        let stats = console.load_stats().await;
        assert_eq!(stats.total_users, 3);
    }

    #[test]
    fn second_action_on_same_entity_is_refused() {
        let (client, options) = clients(Some("ADMIN"));
        let console = AdminConsole::new(client, options).unwrap();
        let guard = console.begin("7", AdminAction::Approve).unwrap();
        assert!(console.begin("7", AdminAction::Reject).is_err());
        assert!(console.begin("8", AdminAction::Reject).is_ok());
        drop(guard);
        assert!(console.begin("7", AdminAction::Reject).is_ok());
    }
}
