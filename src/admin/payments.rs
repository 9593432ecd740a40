//! Payment approvals and transactions panels

use tracing::info;

use super::{AdminAction, AdminConsole};
use crate::api::{Payment, Transaction};
use crate::error::{ClientError, ClientResult};

impl AdminConsole {
    /// Deposits awaiting review
    pub async fn pending_payments(&self) -> ClientResult<Vec<Payment>> {
        self.client.list_payments(Some("PENDING")).await
    }

    pub async fn payment_action(&self, payment_id: &str, action: AdminAction) -> ClientResult<Vec<Payment>> {
        let _guard = self.begin(payment_id, action)?;
        match action {
            AdminAction::Approve => self.client.approve_payment(payment_id).await?,
            AdminAction::Reject => self.client.reject_payment(payment_id).await?,
        }
        info!(payment_id = %payment_id, action = %action, "Payment processed");
        self.pending_payments().await
    }

    pub async fn transactions(&self) -> ClientResult<Vec<Transaction>> {
        self.client.list_transactions().await
    }

    /// Only PENDING transactions can be approved or rejected
    pub async fn transaction_action(
        &self,
        transaction: &Transaction,
        action: AdminAction,
    ) -> ClientResult<Vec<Transaction>> {
        if !transaction.is_pending() {
            return Err(ClientError::validation(format!(
                "Transaction {} is {} and cannot be changed",
                transaction.id, transaction.status
            )));
        }
        let _guard = self.begin(&transaction.id, action)?;
        match action {
            AdminAction::Approve => self.client.approve_transaction(&transaction.id).await?,
            AdminAction::Reject => self.client.reject_transaction(&transaction.id).await?,
        }
        info!(transaction_id = %transaction.id, action = %action, "Transaction processed");
        self.transactions().await
    }
}
