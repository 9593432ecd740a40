//! Backend REST API Client
//!
//! Handles HTTP communication with the TradeFlow backend. Every call carries
//! the bearer token of the current session when one is present.

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::*;
use crate::error::{ClientError, ClientResult};
use crate::session::{Session, SessionHandle};

/// REST API client for the TradeFlow backend
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    session: SessionHandle,
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(base_url: &str, timeout: Duration, session: SessionHandle) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Network {
                path: base_url.to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.session.current().bearer() {
            Some(bearer) => builder.header(AUTHORIZATION, bearer),
            None => builder,
        }
    }

    /// Session with a user id, or NoSession
    pub fn require_user(&self) -> ClientResult<(Session, String)> {
        let session = self.session.current();
        let user_id = session
            .user_id()
            .ok_or(ClientError::NoSession("user id not found"))?;
        Ok((session, user_id))
    }

    async fn execute(&self, path: &str, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await.map_err(|e| ClientError::Network {
            path: path.to_string(),
            source: e,
        })?;
        debug!(path = %path, status = %response.status(), "Backend response");
        Ok(response)
    }

    async fn check(path: &str, response: Response) -> ClientResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            path: path.to_string(),
            status,
            message: extract_message(&text).unwrap_or(text),
        })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> ClientResult<T> {
        let bytes = response.bytes().await.map_err(|e| ClientError::Network {
            path: path.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.execute(path, self.request(Method::GET, path)).await?;
        let response = Self::check(path, response).await?;
        Self::decode(path, response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .execute(path, self.request(method, path).json(body))
            .await?;
        let response = Self::check(path, response).await?;
        Self::decode(path, response).await
    }

    /// Send a request whose response body is ignored
    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<()> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.execute(path, builder).await?;
        Self::check(path, response).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────

    /// POST /auth/login; stores the access token in the session
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let path = "/auth/login";
        let resp: LoginResponse = self
            .send_json(
                Method::POST,
                path,
                &json!({ "email": email, "password": password }),
            )
            .await?;

        let user = resp.user.unwrap_or(LoginUser {
            id: None,
            email: None,
            role: None,
        });
        let session = Session {
            token: Some(resp.access_token),
            user_id: user.id,
            role: user.role,
            email: Some(user.email.unwrap_or_else(|| email.to_string())),
            name: email.split('@').next().map(str::to_string),
        };
        self.session
            .login(session.clone())
            .map_err(|e| ClientError::Decode {
                path: path.to_string(),
                message: format!("failed to store session: {e}"),
            })?;
        Ok(self.session.current())
    }

    /// POST /auth/register
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<Value> {
        self.send_json(Method::POST, "/auth/register", request).await
    }

    /// GET /auth/verify
    pub async fn verify(&self) -> ClientResult<Value> {
        self.get_json("/auth/verify").await
    }

    /// POST /auth/logout. The local session is cleared even if the call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self
            .send_unit::<Value>(Method::POST, "/auth/logout", None)
            .await;
        if let Err(e) = &result {
            warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }
        if let Err(e) = self.session.logout() {
            warn!(error = %e, "Failed to clear stored session");
        }
        result
    }

    // ─────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────

    /// GET /users
    pub async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.get_json("/users").await
    }

    /// GET /users/:id
    pub async fn get_user(&self, user_id: &str) -> ClientResult<UserProfile> {
        self.get_json(&format!("/users/{}", user_id)).await
    }

    /// PATCH /users/:id/status
    pub async fn set_user_status(&self, user_id: &str, is_active: bool) -> ClientResult<()> {
        self.send_unit(
            Method::PATCH,
            &format!("/users/{}/status", user_id),
            Some(&json!({ "isActive": is_active })),
        )
        .await
    }

    /// PATCH /users/:id/force-loss
    pub async fn set_force_loss(&self, user_id: &str, enabled: bool) -> ClientResult<()> {
        self.send_unit(
            Method::PATCH,
            &format!("/users/{}/force-loss", user_id),
            Some(&json!({ "forceLossEnabled": enabled })),
        )
        .await
    }

    /// PATCH /users/:id/balance
    pub async fn set_user_balance(&self, user_id: &str, balance: f64) -> ClientResult<()> {
        self.send_unit(
            Method::PATCH,
            &format!("/users/{}/balance", user_id),
            Some(&json!({ "balance": balance })),
        )
        .await
    }

    /// PATCH /users/:id/password
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: Option<&str>,
        new_password: &str,
    ) -> ClientResult<()> {
        let mut body = json!({ "newPassword": new_password });
        if let Some(current) = current_password {
            body["currentPassword"] = Value::String(current.to_string());
        }
        self.send_unit(
            Method::PATCH,
            &format!("/users/{}/password", user_id),
            Some(&body),
        )
        .await
    }

    /// DELETE /users/:id
    pub async fn delete_user(&self, user_id: &str) -> ClientResult<()> {
        self.send_unit::<Value>(Method::DELETE, &format!("/users/{}", user_id), None)
            .await
    }

    /// GET /users/:id/balance. Accepts an object or a non-empty array of objects.
    pub async fn get_balance(&self, user_id: &str) -> ClientResult<BalanceData> {
        let path = format!("/users/{}/balance", user_id);
        let raw: Value = self.get_json(&path).await?;
        parse_balance(&raw).ok_or(ClientError::Decode {
            path,
            message: "Invalid balance data format".to_string(),
        })
    }

    /// GET /users/:id/billing-history
    pub async fn billing_history(&self, user_id: &str) -> ClientResult<Vec<BillingEntry>> {
        self.get_json(&format!("/users/{}/billing-history", user_id))
            .await
    }

    // ─────────────────────────────────────────────────────────────────
    // Payments, transactions, withdrawals
    // ─────────────────────────────────────────────────────────────────

    /// GET /payments, optionally filtered by status
    pub async fn list_payments(&self, status: Option<&str>) -> ClientResult<Vec<Payment>> {
        match status {
            Some(status) => self.get_json(&format!("/payments?status={}", status)).await,
            None => self.get_json("/payments").await,
        }
    }

    /// POST /payments
    pub async fn create_payment(&self, request: &PaymentRequest) -> ClientResult<Payment> {
        self.send_json(Method::POST, "/payments", request).await
    }

    /// POST /payments/:id/approve
    pub async fn approve_payment(&self, payment_id: &str) -> ClientResult<()> {
        self.send_unit(
            Method::POST,
            &format!("/payments/{}/approve", payment_id),
            Some(&json!({})),
        )
        .await
    }

    /// POST /payments/:id/reject
    pub async fn reject_payment(&self, payment_id: &str) -> ClientResult<()> {
        self.send_unit(
            Method::POST,
            &format!("/payments/{}/reject", payment_id),
            Some(&json!({})),
        )
        .await
    }

    /// GET /transactions
    pub async fn list_transactions(&self) -> ClientResult<Vec<Transaction>> {
        self.get_json("/transactions").await
    }

    /// POST /transactions/:id/approve
    pub async fn approve_transaction(&self, transaction_id: &str) -> ClientResult<()> {
        self.send_unit(
            Method::POST,
            &format!("/transactions/{}/approve", transaction_id),
            Some(&json!({})),
        )
        .await
    }

    /// POST /transactions/:id/reject
    pub async fn reject_transaction(&self, transaction_id: &str) -> ClientResult<()> {
        self.send_unit(
            Method::POST,
            &format!("/transactions/{}/reject", transaction_id),
            Some(&json!({})),
        )
        .await
    }

    /// GET /withdrawals
    pub async fn list_withdrawals(&self) -> ClientResult<Vec<Withdrawal>> {
        self.get_json("/withdrawals").await
    }

    /// POST /withdrawals
    pub async fn create_withdrawal(&self, request: &WithdrawalRequest) -> ClientResult<Withdrawal> {
        self.send_json(Method::POST, "/withdrawals", request).await
    }

    /// POST /withdrawals/:id/approve
    pub async fn approve_withdrawal(
        &self,
        withdrawal_id: &str,
        approval: &WithdrawalApproval,
    ) -> ClientResult<()> {
        self.send_unit(
            Method::POST,
            &format!("/withdrawals/{}/approve", withdrawal_id),
            Some(approval),
        )
        .await
    }

    /// POST /withdrawals/:id/reject
    pub async fn reject_withdrawal(&self, withdrawal_id: &str, reason: &str) -> ClientResult<()> {
        self.send_unit(
            Method::POST,
            &format!("/withdrawals/{}/reject", withdrawal_id),
            Some(&json!({ "reason": reason })),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────
    // Orders and prediction options
    // ─────────────────────────────────────────────────────────────────

    /// GET /orders?userId=...; None on 304 Not Modified
    pub async fn fetch_user_orders(&self, user_id: &str) -> ClientResult<Option<Vec<Value>>> {
        let path = "/orders";
        let builder = self
            .request(Method::GET, path)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .query(&[("userId", user_id)]);
        let response = self.execute(path, builder).await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        let response = Self::check(path, response).await?;
        let raw: Value = Self::decode(path, response).await?;
        Ok(Some(match raw {
            Value::Array(items) => items,
            _ => Vec::new(),
        }))
    }

    /// GET /orders (all users, admin view)
    pub async fn list_all_orders(&self) -> ClientResult<Vec<AdminOrder>> {
        self.get_json("/orders").await
    }

    /// POST /orders
    pub async fn create_order(&self, body: &Value) -> ClientResult<Value> {
        let path = "/orders";
        let response = self
            .execute(path, self.request(Method::POST, path).json(body))
            .await?;
        let response = Self::check(path, response).await?;
        let bytes = response.bytes().await.map_err(|e| ClientError::Network {
            path: path.to_string(),
            source: e,
        })?;
        Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// GET /prediction-options, optionally scoped to a pair
    pub async fn prediction_options(&self, pair: Option<&str>) -> ClientResult<Vec<PredictionOption>> {
        let path = "/prediction-options";
        let mut builder = self.request(Method::GET, path);
        if let Some(pair) = pair {
            builder = builder.query(&[("pair", pair)]);
        }
        let response = self.execute(path, builder).await?;
        let response = Self::check(path, response).await?;
        Self::decode(path, response).await
    }
}

/// Pull a human-readable message out of an error body
fn extract_message(text: &str) -> Option<String> {
    let raw: Value = serde_json::from_str(text).ok()?;
    let message = raw.get("message").or_else(|| raw.get("error"))?;
    match message {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

/// Balance arrives either as `{balance, currency}` or `[{balance, currency}, ...]`
pub fn parse_balance(raw: &Value) -> Option<BalanceData> {
    let candidate = match raw {
        Value::Array(items) => items.first()?,
        Value::Object(map) if map.contains_key("balance") => raw,
        _ => return None,
    };
    serde_json::from_value(candidate.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_accepts_object_and_array() {
        let obj = json!({"balance": "250.5", "currency": "USDT"});
        assert_eq!(parse_balance(&obj).unwrap().balance, 250.5);

        let arr = json!([{"balance": 10, "currency": "BTC"}, {"balance": 1}]);
        let parsed = parse_balance(&arr).unwrap();
        assert_eq!(parsed.currency, "BTC");

        assert!(parse_balance(&json!([])).is_none());
        assert!(parse_balance(&json!({"amount": 3})).is_none());
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            extract_message(r#"{"message":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            extract_message(r#"{"message":["email must be an email","password too short"]}"#)
                .as_deref(),
            Some("email must be an email, password too short")
        );
        assert_eq!(extract_message("<html>").as_deref(), None);
    }
}
