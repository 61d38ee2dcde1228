use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::store::{
    KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_DATA_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Tokens and user record issued at login/registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "access")]
    pub access_token: String,
    #[serde(rename = "refresh")]
    pub refresh_token: String,
    #[serde(rename = "usuario", default)]
    pub user: Value,
}

impl Session {
    /// Read the session from the store. Requires both tokens; a missing or
    /// unparseable user record reads as `null`.
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = store.get(REFRESH_TOKEN_KEY)?;
        let user = store
            .get(USER_DATA_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(Value::Null);
        Some(Self {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Persist exactly the three session fields.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store
            .set(ACCESS_TOKEN_KEY, &self.access_token)
            .context("Failed to store access token")?;
        store
            .set(REFRESH_TOKEN_KEY, &self.refresh_token)
            .context("Failed to store refresh token")?;
        store
            .set(USER_DATA_KEY, &self.user.to_string())
            .context("Failed to store user data")?;
        Ok(())
    }

    /// Remove every session key. Keeps going past individual failures so
    /// that as much state as possible is gone.
    pub fn clear(store: &dyn KeyValueStore) {
        for key in SESSION_KEYS {
            if let Err(e) = store.remove(key) {
                warn!(key, error = %e, "Failed to clear session key");
            }
        }
    }

    /// Expiry of the access token, when it is a JWT with an `exp` claim
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        token_expiry(&self.access_token)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.access_expires_at()
            .map(|exp| (exp - Utc::now()).num_minutes().max(0))
    }

    /// Display name from the user record, if present
    pub fn user_name(&self) -> Option<&str> {
        self.user.get("nome").and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
struct ExpClaim {
    exp: i64,
}

/// Decode the `exp` claim of a JWT without verifying its signature.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claim.exp, 0)
}

#[cfg(test)]
pub(crate) fn test_jwt(exp: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{},"user_id":7}}"#, exp.timestamp()));
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, REMEMBER_KEY, USER_KEY};
    use serde_json::json;

    fn sample() -> Session {
        Session {
            access_token: "acc".to_string(),
            refresh_token: "ref".to_string(),
            user: json!({"id": 1, "nome": "Maria"}),
        }
    }

    #[test]
    fn test_parses_login_response_shape() {
        let body = json!({
            "access": "a",
            "refresh": "r",
            "usuario": {"nome": "Ana"},
            "mensagem": "Login realizado com sucesso"
        });
        let session: Session = serde_json::from_value(body).unwrap();
        assert_eq!(session.access_token, "a");
        assert_eq!(session.refresh_token, "r");
        assert_eq!(session.user_name(), Some("Ana"));
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        assert_eq!(Session::load(&store), None);

        sample().save(&store).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(Session::load(&store), Some(sample()));
    }

    #[test]
    fn test_load_requires_both_tokens() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "acc").unwrap();
        assert_eq!(Session::load(&store), None);
    }

    #[test]
    fn test_clear_removes_every_key() {
        let store = MemoryStore::new();
        sample().save(&store).unwrap();
        store.set(USER_KEY, "{}").unwrap();
        store.set(REMEMBER_KEY, "true").unwrap();

        Session::clear(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_token_expiry_from_jwt() {
        let exp = DateTime::from_timestamp(Utc::now().timestamp() + 3600, 0).unwrap();
        let session = Session {
            access_token: test_jwt(exp),
            ..sample()
        };
        assert_eq!(session.access_expires_at(), Some(exp));
        let minutes = session.minutes_until_expiry().unwrap();
        assert!((59..=60).contains(&minutes));
    }

    #[test]
    fn test_past_expiry_reports_zero_minutes() {
        let exp = DateTime::from_timestamp(Utc::now().timestamp() - 600, 0).unwrap();
        let session = Session {
            access_token: test_jwt(exp),
            ..sample()
        };
        assert_eq!(session.minutes_until_expiry(), Some(0));
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        let session = sample();
        assert_eq!(session.access_expires_at(), None);
        assert_eq!(session.minutes_until_expiry(), None);
        assert_eq!(token_expiry("a.!!!.c"), None);
    }
}
