//! User management panel

use futures_util::future::join_all;
use tracing::{info, warn};

use super::AdminConsole;
use crate::api::User;
use crate::error::{ClientError, ClientResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Per-user result of a bulk force-loss toggle
#[derive(Debug)]
pub struct ForceLossOutcome {
    pub user_id: String,
    pub result: ClientResult<()>,
}

/// Case-insensitive match on email, first or last name. Empty term keeps all.
pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    users.iter().filter(|u| u.matches(term)).collect()
}

/// Balance edits must be finite and non-negative
pub fn parse_balance_input(input: &str) -> ClientResult<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ClientError::validation("Please enter a valid non-negative balance"))
}

impl AdminConsole {
    pub async fn users(&self) -> ClientResult<Vec<User>> {
        self.client.list_users().await
    }

    pub async fn set_user_status(&self, user_id: &str, is_active: bool) -> ClientResult<Vec<User>> {
        self.client.set_user_status(user_id, is_active).await?;
        info!(user_id = %user_id, is_active, "User status updated");
        self.users().await
    }

    pub async fn set_force_loss(&self, user_id: &str, enabled: bool) -> ClientResult<Vec<User>> {
        self.client.set_force_loss(user_id, enabled).await?;
        info!(user_id = %user_id, enabled, "Force loss updated");
        self.users().await
    }

    /// Toggle force loss for every user concurrently. Best-effort: failures
    /// are reported per user and nothing is rolled back.
    pub async fn set_force_loss_all(&self, enabled: bool) -> ClientResult<Vec<ForceLossOutcome>> {
        let users = self.users().await?;
        let results = join_all(
            users
                .iter()
                .map(|u| self.client.set_force_loss(&u.id, enabled)),
        )
        .await;

        let outcomes: Vec<ForceLossOutcome> = users
            .into_iter()
            .zip(results)
            .map(|(user, result)| ForceLossOutcome {
                user_id: user.id,
                result,
            })
            .collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(failed, total = outcomes.len(), enabled, "Force loss not applied to every user");
        } else {
            info!(total = outcomes.len(), enabled, "Force loss applied to all users");
        }
        Ok(outcomes)
    }

    pub async fn edit_balance(&self, user_id: &str, input: &str) -> ClientResult<Vec<User>> {
        let balance = parse_balance_input(input)?;
        self.client.set_user_balance(user_id, balance).await?;
        info!(user_id = %user_id, balance, "User balance updated");
        self.users().await
    }

    pub async fn change_password(&self, user_id: &str, new_password: &str) -> ClientResult<()> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ClientError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        self.client.change_password(user_id, None, new_password).await?;
        info!(user_id = %user_id, "User password changed");
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> ClientResult<Vec<User>> {
        self.client.delete_user(user_id).await?;
        info!(user_id = %user_id, "User deleted");
        self.users().await
    }
}
