//! Bearer credential lifecycle
//!
//! The credential is refreshed with a password grant whenever it is unset or
//! expired. Nothing is retried here; the next sync cycle simply asks again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::models::TokenResponse;
use super::TelemetryApi;
use crate::error::{AuthError, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
}

impl Credential {
    fn unset() -> Self {
        Self {
            token: String::new(),
            expires_at: DateTime::<Utc>::MIN_UTC,
            user_id: 0,
        }
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

pub struct CredentialManager {
    api: Arc<dyn TelemetryApi>,
    credential: Credential,
}

impl CredentialManager {
    pub fn new(api: Arc<dyn TelemetryApi>) -> Self {
        Self {
            api,
            credential: Credential::unset(),
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> &Credential {
        &self.credential
    }

    pub async fn ensure_valid(&mut self) -> Result<Credential, AuthError> {
        self.ensure_valid_at(Utc::now()).await
    }

    /// Return the stored credential if usable at `now`, otherwise exchange for a new one
    pub async fn ensure_valid_at(&mut self, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        if self.credential.is_usable_at(now) {
            return Ok(self.credential.clone());
        }

        let body = self.api.request_token().await.map_err(|e| {
            tracing::error!("[TokenManager] Token request failed: {}", e);
            AuthError::from(e)
        })?;

        let credential = parse_token(&body, now).map_err(|e| {
            tracing::warn!("[TokenManager] Token response rejected: {}", e);
            tracing::debug!("[TokenManager] {}", body);
            e
        })?;

        self.credential = credential.clone();
        tracing::info!(
            "[TokenManager] Token acquired for user {}, expires at {}",
            credential.user_id,
            credential.expires_at
        );
        Ok(credential)
    }
}

fn parse_token(body: &str, now: DateTime<Utc>) -> Result<Credential, AuthError> {
    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))?;

    let user_id = parsed.user_id.ok_or(AuthError::MissingField("userId"))?;
    let expires_in = parsed
        .expires_in
        .ok_or(AuthError::MissingField("expires_in"))?;
    let token = parsed
        .access_token
        .ok_or(AuthError::MissingField("access_token"))?;

    let user_id = user_id.as_i64("userId").map_err(invalid)?;
    let expires_in = expires_in.as_i64("expires_in").map_err(invalid)?;

    let expires_at = Duration::try_seconds(expires_in)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AuthError::Malformed(format!("expires_in out of range: {}", expires_in)))?;

    Ok(Credential {
        token,
        expires_at,
        user_id,
    })
}

fn invalid(e: ValidationError) -> AuthError {
    AuthError::Malformed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::testing::ScriptedApi;

    const TOKEN_BODY: &str = r#"{"userId": 42, "expires_in": 3600, "access_token": "abc"}"#;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_exchange_when_unset() {
        let api = Arc::new(ScriptedApi::new());
        api.push_token(Ok(TOKEN_BODY.to_string()));
        let mut manager = CredentialManager::new(api.clone());

        let credential = manager.ensure_valid_at(at(0)).await.unwrap();
        assert_eq!(credential.token, "abc");
        assert_eq!(credential.user_id, 42);
        assert_eq!(credential.expires_at, at(3600));
        assert_eq!(api.token_requests(), 1);
    }

    #[tokio::test]
    async fn test_reuse_until_expiry() {
        let api = Arc::new(ScriptedApi::new());
        api.push_token(Ok(TOKEN_BODY.to_string()));
        api.push_token(Ok(
            r#"{"userId": 42, "expires_in": 3600, "access_token": "def"}"#.to_string(),
        ));
        let mut manager = CredentialManager::new(api.clone());

        manager.ensure_valid_at(at(0)).await.unwrap();
        let reused = manager.ensure_valid_at(at(3599)).await.unwrap();
        assert_eq!(reused.token, "abc");
        assert_eq!(api.token_requests(), 1);

        // now >= expiresAt triggers exactly one new exchange
        let refreshed = manager.ensure_valid_at(at(3600)).await.unwrap();
        assert_eq!(refreshed.token, "def");
        assert_eq!(refreshed.expires_at, at(7200));
        assert_eq!(api.token_requests(), 2);
    }

    #[tokio::test]
    async fn test_missing_field_keeps_previous_state() {
        let api = Arc::new(ScriptedApi::new());
        api.push_token(Ok(r#"{"userId": 42, "access_token": "abc"}"#.to_string()));
        let mut manager = CredentialManager::new(api.clone());

        let err = manager.ensure_valid_at(at(0)).await.unwrap_err();
        assert_eq!(err, AuthError::MissingField("expires_in"));
        assert!(manager.current().token.is_empty());
        assert!(!manager.current().is_usable_at(at(0)));
    }

    #[tokio::test]
    async fn test_null_field_is_missing() {
        let api = Arc::new(ScriptedApi::new());
        api.push_token(Ok(
            r#"{"userId": null, "expires_in": 60, "access_token": "abc"}"#.to_string(),
        ));
        let mut manager = CredentialManager::new(api);

        let err = manager.ensure_valid_at(at(0)).await.unwrap_err();
        assert_eq!(err, AuthError::MissingField("userId"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let api = Arc::new(ScriptedApi::new());
        api.push_token(Err(TransportError::EmptyBody));
        let mut manager = CredentialManager::new(api.clone());

        let err = manager.ensure_valid_at(at(0)).await.unwrap_err();
        assert_eq!(err, AuthError::TransportFailure(TransportError::EmptyBody));
        assert_eq!(api.token_requests(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let api = Arc::new(ScriptedApi::new());
        api.push_token(Ok("<html>bad gateway</html>".to_string()));
        let mut manager = CredentialManager::new(api);

        let err = manager.ensure_valid_at(at(0)).await.unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }
}
