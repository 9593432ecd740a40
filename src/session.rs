//! Authenticated session
//!
//! Replaces ambient token/user-id lookups with an explicit value that is
//! passed to every client. The user id is either stored alongside the token
//! or recovered from the JWT `sub` claim.

use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::persistence::KeyValueStore;

const SESSION_KEY: &str = "session";
pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Session {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Stored user id, else the `sub` claim of the bearer token
    pub fn user_id(&self) -> Option<String> {
        if let Some(id) = self.user_id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }
        let token = self.token.as_deref()?;
        match decode_jwt_subject(token) {
            Some(sub) => Some(sub),
            None => {
                warn!("Failed to decode user id from token");
                None
            }
        }
    }

    /// Cache the decoded user id so later lookups skip the JWT decode
    pub fn resolve_user_id(&mut self) -> Option<String> {
        let id = self.user_id()?;
        self.user_id = Some(id.clone());
        Some(id)
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    pub fn bearer(&self) -> Option<String> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {}", t))
    }
}

/// Decode the payload segment of a JWT and return its `sub` claim.
/// The signature is not verified; the backend remains the authority.
pub fn decode_jwt_subject(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .or_else(|_| general_purpose::STANDARD.decode(payload))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    match claims.get("sub")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Shared, observable session. Every subscriber sees login and logout.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Session>>,
    store: Arc<dyn KeyValueStore>,
}

impl SessionHandle {
    /// Restore the last saved session from the store
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = match store.get(SESSION_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable stored session");
                Session::default()
            }),
            None => Session::default(),
        };
        let (tx, _) = watch::channel(session);
        Ok(Self {
            tx: Arc::new(tx),
            store,
        })
    }

    /// Session that is never persisted beyond the process
    pub fn ephemeral(session: Session) -> Self {
        let (tx, _) = watch::channel(session);
        Self {
            tx: Arc::new(tx),
            store: Arc::new(crate::persistence::MemoryStore::default()),
        }
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn login(&self, mut session: Session) -> Result<()> {
        session.resolve_user_id();
        let raw = serde_json::to_string(&session)?;
        self.store.set(SESSION_KEY, &raw)?;
        debug!(user_id = ?session.user_id, role = ?session.role, "Session stored");
        self.tx.send_replace(session);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        self.tx.send_replace(Session::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    // {"sub":"42","email":"a@b.c"}
    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiI0MiIsImVtYWlsIjoiYUBiLmMifQ.sig";

    #[test]
    fn user_id_falls_back_to_jwt_subject() {
        let session = Session::with_token(TOKEN);
        assert_eq!(session.user_id().as_deref(), Some("42"));
    }

    #[test]
    fn stored_user_id_wins_over_token() {
        let session = Session {
            token: Some(TOKEN.to_string()),
            user_id: Some("7".to_string()),
            ..Default::default()
        };
        assert_eq!(session.user_id().as_deref(), Some("7"));
    }

    #[test]
    fn garbage_token_has_no_user() {
        assert_eq!(Session::with_token("not-a-jwt").user_id(), None);
        assert_eq!(Session::default().user_id(), None);
    }

    #[test]
    fn numeric_subject_is_stringified() {
        // {"sub":15}
        let token = "x.eyJzdWIiOjE1fQ.y";
        assert_eq!(decode_jwt_subject(token).as_deref(), Some("15"));
    }

    #[test]
    fn login_notifies_subscribers_and_persists() {
        let store = Arc::new(MemoryStore::default());
        let handle = SessionHandle::load(store.clone()).unwrap();
        let mut rx = handle.subscribe();

        handle.login(Session::with_token(TOKEN)).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().user_id.as_deref(), Some("42"));

        let restored = SessionHandle::load(store.clone()).unwrap();
        assert!(restored.current().is_authenticated());

        handle.logout().unwrap();
        assert!(!handle.current().is_authenticated());
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }
}
