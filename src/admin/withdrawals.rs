//! Withdrawal requests panel

use tracing::info;

use super::{AdminAction, AdminConsole};
use crate::api::{Withdrawal, WithdrawalApproval};
use crate::error::{ClientError, ClientResult};

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Approval payload from admin input. The amount defaults to the requested
/// amount and must be positive; blank hash and note are omitted.
pub fn build_approval(
    withdrawal: &Withdrawal,
    amount_input: Option<&str>,
    tx_hash: Option<&str>,
    admin_note: Option<&str>,
) -> ClientResult<WithdrawalApproval> {
    let amount = match amount_input {
        None => withdrawal.amount,
        Some(raw) if raw.trim().is_empty() => 0.0,
        Some(raw) => raw.trim().parse::<f64>().unwrap_or(f64::NAN),
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ClientError::validation(
            "Please enter a valid amount greater than zero",
        ));
    }
    Ok(WithdrawalApproval {
        amount,
        tx_hash: trimmed(tx_hash),
        admin_note: trimmed(admin_note),
    })
}

fn ensure_actionable(withdrawal: &Withdrawal) -> ClientResult<()> {
    if withdrawal.is_actionable() {
        Ok(())
    } else {
        Err(ClientError::validation(format!(
            "Withdrawal {} is already {}",
            withdrawal.id, withdrawal.status
        )))
    }
}

impl AdminConsole {
    pub async fn withdrawals(&self) -> ClientResult<Vec<Withdrawal>> {
        self.client.list_withdrawals().await
    }

    pub async fn approve_withdrawal(
        &self,
        withdrawal: &Withdrawal,
        amount_input: Option<&str>,
        tx_hash: Option<&str>,
        admin_note: Option<&str>,
    ) -> ClientResult<Vec<Withdrawal>> {
        ensure_actionable(withdrawal)?;
        let approval = build_approval(withdrawal, amount_input, tx_hash, admin_note)?;
        let _guard = self.begin(&withdrawal.id, AdminAction::Approve)?;
        self.client
            .approve_withdrawal(&withdrawal.id, &approval)
            .await?;
        info!(withdrawal_id = %withdrawal.id, amount = approval.amount, "Withdrawal approved");
        self.withdrawals().await
    }

    pub async fn reject_withdrawal(&self, withdrawal: &Withdrawal, reason: &str) -> ClientResult<Vec<Withdrawal>> {
        ensure_actionable(withdrawal)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ClientError::validation("Rejection requires a reason"));
        }
        let _guard = self.begin(&withdrawal.id, AdminAction::Reject)?;
        self.client.reject_withdrawal(&withdrawal.id, reason).await?;
        info!(withdrawal_id = %withdrawal.id, reason = %reason, "Withdrawal rejected");
        self.withdrawals().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn withdrawal(status: &str) -> Withdrawal {
        serde_json::from_value(serde_json::json!({
            "id": 12, "userId": 3, "asset": "USDT", "amount": "250",
            "network": "TRC20", "address": "T123", "status": status
        }))
        .unwrap()
    }

    #[test]
    fn amount_defaults_to_request() {
        let approval = build_approval(&withdrawal("PENDING"), None, None, None).unwrap();
        assert_eq!(approval.amount, 250.0);
        assert_eq!(approval.tx_hash, None);
    }

    #[test]
    fn zero_or_blank_amount_is_rejected() {
        let w = withdrawal("PENDING");
        for input in ["", "  ", "0", "-3", "abc", "inf", "infinity", "1e999"] {
            let err = build_approval(&w, Some(input), None, None).unwrap_err();
            assert!(err.is_validation(), "input {:?} should be rejected", input);
        }
    }

    #[test]
    fn optional_fields_are_trimmed_and_omitted() {
        let w = withdrawal("PENDING");
        let approval = build_approval(&w, Some(" 240 "), Some("  0xabc "), Some("   ")).unwrap();
        assert_eq!(
            approval,
            WithdrawalApproval {
                amount: 240.0,
                tx_hash: Some("0xabc".into()),
                admin_note: None,
            }
        );
        let body = serde_json::to_value(&approval).unwrap();
        assert_eq!(body, serde_json::json!({"amount": 240.0, "txHash": "0xabc"}));
    }

    #[test]
    fn terminal_withdrawals_accept_no_action() {
        assert!(ensure_actionable(&withdrawal("approved")).is_err());
        assert!(ensure_actionable(&withdrawal("PROCESSING")).is_ok());
    }
}
