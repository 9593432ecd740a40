//! Backend DTOs
//!
//! Shapes returned by the TradeFlow backend. Fields the backend does not
//! always send are optional or defaulted.

use serde::{Deserialize, Deserializer, Serialize};

/// Ids arrive as numbers or strings depending on the endpoint
pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Numbers sometimes arrive as decimal strings
pub fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(crate::orders::coerce_number(&value).unwrap_or(0.0))
}

pub fn de_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(crate::orders::coerce_number))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub force_loss_enabled: bool,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Case-insensitive match on email, first or last name
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.email.to_lowercase().contains(&term)
            || self.first_name.to_lowercase().contains(&term)
            || self.last_name.to_lowercase().contains(&term)
    }
}

/// Embedded user summary on payments, transactions and withdrawals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub proof_url: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user: Option<UserRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl Transaction {
    pub fn is_pending(&self) -> bool {
        self.status == "PENDING"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(default)]
    pub asset: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub user_note: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl Withdrawal {
    /// Terminal statuses accept no further admin action
    pub fn is_actionable(&self) -> bool {
        !matches!(
            self.status.to_uppercase().as_str(),
            "COMPLETED" | "APPROVED" | "REJECTED" | "FAILED"
        )
    }
}

/// New withdrawal request from a user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub user_id: String,
    pub asset: String,
    pub amount: f64,
    pub network: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_note: Option<String>,
}

/// New deposit (payment) submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
}

/// Payload for POST /withdrawals/:id/approve
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalApproval {
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}

/// Order as listed in the admin console
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(deserialize_with = "de_amount", default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "type")]
    pub trade_type: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub price: Option<f64>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub settled_payout: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub settled_loss_amount: Option<f64>,
    #[serde(default)]
    pub forced_loss_expected: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub loss_percent: Option<f64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl AdminOrder {
    /// Explicit result, uppercased
    pub fn normalized_result(&self) -> Option<String> {
        self.result
            .as_deref()
            .or(self.outcome.as_deref())
            .map(|r| r.to_uppercase())
    }

    /// Result if settled, else the status uppercased, else PENDING
    pub fn status_label(&self) -> String {
        if let Some(result) = self.normalized_result() {
            return result;
        }
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| "PENDING".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceData {
    #[serde(deserialize_with = "de_amount")]
    pub balance: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

pub fn default_currency() -> String {
    "USDT".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// User-facing profile (GET /users/:id)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub force_loss_enabled: Option<bool>,
}

/// Configured (duration, return-rate, capital-range) tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOption {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    pub seconds: u32,
    pub return_rate: f64,
    pub capital_min: f64,
    pub capital_max: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

impl PredictionOption {
    /// Label used in the trade ticket, e.g. "30s"
    pub fn label(&self) -> String {
        format!("{}s", self.seconds)
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.capital_min && amount <= self.capital_max
    }

    /// Options without a pair apply to every pair
    pub fn applies_to(&self, pair: &str) -> bool {
        match self.pair.as_deref() {
            None | Some("") => true,
            Some(p) => p.eq_ignore_ascii_case(pair),
        }
    }
}

/// Body for creating or replacing a prediction option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPredictionOption {
    pub seconds: f64,
    pub return_rate: f64,
    pub capital_min: f64,
    pub capital_max: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

impl NewPredictionOption {
    /// Same rules the local service enforces
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.seconds.is_finite()
            || self.seconds <= 0.0
            || self.seconds > f64::from(u32::MAX)
            || self.seconds.fract() != 0.0
        {
            return Err("Invalid seconds");
        }
        if !self.return_rate.is_finite() || self.return_rate <= 0.0 {
            return Err("Invalid returnRate");
        }
        if !self.capital_min.is_finite()
            || !self.capital_max.is_finite()
            || self.capital_min < 0.0
            || self.capital_max < self.capital_min
        {
            return Err("Invalid capital range");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub entry_type: String,
    #[serde(deserialize_with = "de_amount", default)]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "timestamp")]
    pub created_at: String,
}

/// Overview counters for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: usize,
    pub active_users: usize,
    pub pending_payments: usize,
    pub recent_transactions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let p: Payment = serde_json::from_str(
            r#"{"id":3,"userId":"9","amount":"12.5","currency":"USDT","status":"PENDING"}"#,
        )
        .unwrap();
        assert_eq!(p.id, "3");
        assert_eq!(p.user_id, "9");
        assert_eq!(p.amount, 12.5);
    }

    #[test]
    fn withdrawal_terminal_statuses() {
        let mut w: Withdrawal = serde_json::from_str(
            r#"{"id":1,"userId":2,"asset":"BTC","amount":1,"status":"pending"}"#,
        )
        .unwrap();
        assert!(w.is_actionable());
        w.status = "approved".into();
        assert!(!w.is_actionable());
        w.status = "FAILED".into();
        assert!(!w.is_actionable());
    }

    #[test]
    fn admin_order_label_prefers_result() {
        let order: AdminOrder = serde_json::from_str(
            r#"{"id":"a","amount":10,"status":"completed","outcome":"loss"}"#,
        )
        .unwrap();
        assert_eq!(order.status_label(), "LOSS");

        let order: AdminOrder = serde_json::from_str(r#"{"id":"b","amount":10}"#).unwrap();
        assert_eq!(order.status_label(), "PENDING");
    }

    #[test]
    fn new_option_validation() {
        let mut opt = NewPredictionOption {
            seconds: 30.0,
            return_rate: 12.0,
            capital_min: 500.0,
            capital_max: 5000.0,
            currency: None,
            pair: None,
            is_active: None,
            sort_order: None,
        };
        assert!(opt.validate().is_ok());
        opt.capital_max = 100.0;
        assert_eq!(opt.validate(), Err("Invalid capital range"));
        opt.capital_max = 5000.0;
        opt.seconds = 0.0;
        assert_eq!(opt.validate(), Err("Invalid seconds"));
        opt.seconds = 5e9;
        assert_eq!(opt.validate(), Err("Invalid seconds"));
        opt.seconds = f64::from(u32::MAX);
        assert!(opt.validate().is_ok());
    }

    #[test]
    fn stats_serialize_dashboard_counters() {
        let stats = Stats {
            total_users: 4,
            active_users: 3,
            pending_payments: 2,
            recent_transactions: 9,
        };
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({
                "totalUsers": 4,
                "activeUsers": 3,
                "pendingPayments": 2,
                "recentTransactions": 9
            })
        );
    }

    #[test]
    fn option_without_pair_applies_everywhere() {
        let opt: PredictionOption = serde_json::from_str(
            r#"{"id":"30-1","seconds":30,"returnRate":12,"capitalMin":500,"capitalMax":5000}"#,
        )
        .unwrap();
        assert!(opt.applies_to("BTC/USDT"));
        assert!(opt.is_active);
        assert_eq!(opt.currency, "USDT");
        assert!(opt.contains(500.0));
        assert!(!opt.contains(5000.01));
    }
}
