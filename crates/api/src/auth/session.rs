//! Refresh session manager.
//!
//! Owns the refresh-token lifecycle on top of a [`SessionStore`] and the
//! [`TokenCodec`]:
//!
//! - [`SessionManager::issue`] creates a session record and an access token.
//! - [`SessionManager::rotate`] consumes a refresh credential exactly once and
//!   issues a replacement pair.
//! - [`SessionManager::revoke`] / [`SessionManager::revoke_one`] end sessions.
//!
//! A presented secret that does not match a *live* record is treated as theft
//! and revokes every session of that user. An unknown or expired id is not.

use std::sync::Arc;

use chrono::{Duration, Utc};
use turnstile_core::credential::RefreshCredential;
use turnstile_core::types::{DbId, SessionId, Timestamp};
use turnstile_db::models::session::CreateRefreshSession;
use turnstile_db::store::{SessionStore, StoreError};

use crate::auth::jwt::{TokenCodec, TokenError};

/// Session-layer failures.
///
/// The first three variants are indistinguishable to clients (all map to the
/// same 401); they are kept apart here for logging and alerting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed refresh credential")]
    MalformedCredential,

    #[error("refresh session is invalid or expired")]
    InvalidOrExpired,

    #[error("refresh credential reuse detected for user {user_id}")]
    ReuseDetected { user_id: DbId },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// A freshly issued access token and refresh credential.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user_id: DbId,
    pub access_token: String,
    pub refresh_credential: RefreshCredential,
    /// Expiry of the refresh session backing `refresh_credential`.
    pub refresh_expires_at: Timestamp,
}

/// Orchestrates issuance, rotation, and revocation of refresh sessions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: Arc<TokenCodec>,
    refresh_ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, codec: Arc<TokenCodec>, refresh_ttl: Duration) -> Self {
        Self {
            store,
            codec,
            refresh_ttl,
        }
    }

    /// Lifetime given to every new refresh session.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Start a new session for `user_id`.
    pub async fn issue(&self, user_id: DbId) -> Result<IssuedSession, SessionError> {
        let (secret, secret_hash) = self.codec.generate_refresh_secret();

        // Sliding window: every issued record lives a full TTL from now.
        let record = self
            .store
            .create(&CreateRefreshSession {
                user_id,
                secret_hash,
                expires_at: Utc::now() + self.refresh_ttl,
            })
            .await?;

        let access_token = self.codec.mint_access(user_id)?;

        tracing::debug!(user_id, session_id = %record.id, "Refresh session issued");

        Ok(IssuedSession {
            user_id,
            access_token,
            refresh_credential: RefreshCredential::new(record.id, secret),
            refresh_expires_at: record.expires_at,
        })
    }

    /// Exchange a refresh credential for a new pair, consuming it.
    pub async fn rotate(&self, raw_credential: &str) -> Result<IssuedSession, SessionError> {
        let credential = RefreshCredential::parse(raw_credential).map_err(|e| {
            tracing::debug!(error = %e, "Rejected malformed refresh credential");
            SessionError::MalformedCredential
        })?;
        let session_id = credential.session_id;

        let Some(record) = self.store.find_by_id(session_id).await? else {
            tracing::debug!(%session_id, "Refresh session not found or expired");
            return Err(SessionError::InvalidOrExpired);
        };
        if record.is_expired_at(Utc::now()) {
            tracing::debug!(%session_id, "Refresh session expired");
            return Err(SessionError::InvalidOrExpired);
        }

        if !self
            .codec
            .verify_refresh_secret(&credential.secret, &record.secret_hash)
        {
            let revoked = self.store.delete_all_for_user(record.user_id).await?;
            tracing::warn!(
                user_id = record.user_id,
                %session_id,
                revoked,
                "Refresh credential reuse detected; revoked all sessions for user"
            );
            return Err(SessionError::ReuseDetected {
                user_id: record.user_id,
            });
        }

        // Single use: only the caller whose delete removed the row may proceed.
        if !self.store.delete_by_id(session_id).await? {
            tracing::debug!(
                user_id = record.user_id,
                %session_id,
                "Refresh session consumed by a concurrent rotation"
            );
            return Err(SessionError::InvalidOrExpired);
        }

        let issued = self.issue(record.user_id).await?;
        tracing::info!(
            user_id = record.user_id,
            old_session_id = %session_id,
            new_session_id = %issued.refresh_credential.session_id,
            "Refresh session rotated"
        );
        Ok(issued)
    }

    /// Revoke every session of a user. Returns the number revoked.
    pub async fn revoke(&self, user_id: DbId) -> Result<u64, SessionError> {
        let revoked = self.store.delete_all_for_user(user_id).await?;
        tracing::info!(user_id, revoked, "Revoked all refresh sessions for user");
        Ok(revoked)
    }

    /// Revoke a single session. Returns `true` if it existed.
    pub async fn revoke_one(&self, session_id: SessionId) -> Result<bool, SessionError> {
        let removed = self.store.delete_by_id(session_id).await?;
        tracing::debug!(%session_id, removed, "Refresh session revoked");
        Ok(removed)
    }

    /// Revoke the session named by a presented credential (logout).
    ///
    /// Malformed input is ignored. The secret is not checked: knowing the id
    /// is enough to end a session, never enough to extend one.
    pub async fn revoke_credential(&self, raw_credential: &str) -> Result<bool, SessionError> {
        match RefreshCredential::parse(raw_credential) {
            Ok(credential) => self.revoke_one(credential.session_id).await,
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use turnstile_db::store::MemorySessionStore;

    use super::*;
    use crate::auth::jwt::JwtConfig;

    fn test_codec() -> Arc<TokenCodec> {
        let config = JwtConfig {
            access_secret: "session-test-access-secret".to_string(),
            refresh_secret: "session-test-refresh-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        };
        Arc::new(TokenCodec::new(&config).unwrap())
    }

    fn test_manager() -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(store.clone(), test_codec(), Duration::days(7));
        (manager, store)
    }

    #[tokio::test]
    async fn test_issue_persists_one_record() {
        let (manager, store) = test_manager();
        let issued = manager.issue(5).await.unwrap();

        assert_eq!(store.count_for_user(5).await, 1);
        assert_eq!(manager.codec().verify(&issued.access_token).unwrap().sub, 5);

        let record = store
            .find_by_id(issued.refresh_credential.session_id)
            .await
            .unwrap()
            .expect("record should exist");
        assert_ne!(record.secret_hash, issued.refresh_credential.secret);
        assert!(record.expires_at > Utc::now() + Duration::days(6));
    }

    #[tokio::test]
    async fn test_rotate_succeeds_once() {
        let (manager, store) = test_manager();
        let original = manager.issue(1).await.unwrap().refresh_credential.to_string();

        let rotated = manager.rotate(&original).await.unwrap();
        assert_eq!(rotated.user_id, 1);
        assert_ne!(rotated.refresh_credential.to_string(), original);
        assert_eq!(store.count_for_user(1).await, 1);

        let replay = manager.rotate(&original).await;
        assert_matches!(replay, Err(SessionError::InvalidOrExpired));

        // The replay did not cascade: the rotated session is still usable.
        assert!(manager
            .rotate(&rotated.refresh_credential.to_string())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_wrong_secret_on_live_record_revokes_all_sessions() {
        let (manager, store) = test_manager();
        let stolen = manager.issue(1).await.unwrap();
        let other_device = manager.issue(1).await.unwrap();
        let bystander = manager.issue(2).await.unwrap();

        let forged = RefreshCredential::new(stolen.refresh_credential.session_id, "f".repeat(64));
        let result = manager.rotate(&forged.to_string()).await;
        assert_matches!(result, Err(SessionError::ReuseDetected { user_id: 1 }));

        assert_eq!(store.count_for_user(1).await, 0);
        assert_matches!(
            manager
                .rotate(&other_device.refresh_credential.to_string())
                .await,
            Err(SessionError::InvalidOrExpired)
        );
        assert_matches!(
            manager
                .rotate(&stolen.refresh_credential.to_string())
                .await,
            Err(SessionError::InvalidOrExpired)
        );

        // Other users are untouched.
        assert!(manager
            .rotate(&bystander.refresh_credential.to_string())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_reuse() {
        let (manager, store) = test_manager();
        manager.issue(1).await.unwrap();

        let unknown = RefreshCredential::new(SessionId::new_v4(), "whatever");
        let result = manager.rotate(&unknown.to_string()).await;

        assert_matches!(result, Err(SessionError::InvalidOrExpired));
        assert_eq!(store.count_for_user(1).await, 1);
    }

    #[tokio::test]
    async fn test_malformed_credential_does_not_touch_store() {
        let (manager, store) = test_manager();
        manager.issue(1).await.unwrap();

        for raw in ["", "no-separator", ":", "not-a-uuid:secret"] {
            assert_matches!(
                manager.rotate(raw).await,
                Err(SessionError::MalformedCredential),
                "{raw:?} should be malformed"
            );
        }
        assert_eq!(store.count_for_user(1).await, 1);
    }

    #[tokio::test]
    async fn test_expired_record_is_invalid_even_with_matching_secret() {
        let (manager, store) = test_manager();
        let (secret, secret_hash) = manager.codec().generate_refresh_secret();
        let record = store
            .create(&CreateRefreshSession {
                user_id: 3,
                secret_hash,
                expires_at: Utc::now() - Duration::seconds(1),
            })
            .await
            .unwrap();

        let credential = RefreshCredential::new(record.id, secret);
        let result = manager.rotate(&credential.to_string()).await;
        assert_matches!(result, Err(SessionError::InvalidOrExpired));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_has_exactly_one_winner() {
        let (manager, _store) = test_manager();
        let manager = Arc::new(manager);

        for _ in 0..25 {
            let credential = manager.issue(9).await.unwrap().refresh_credential.to_string();

            let a = {
                let manager = Arc::clone(&manager);
                let credential = credential.clone();
                tokio::spawn(async move { manager.rotate(&credential).await })
            };
            let b = {
                let manager = Arc::clone(&manager);
                let credential = credential.clone();
                tokio::spawn(async move { manager.rotate(&credential).await })
            };

            let results = [a.await.unwrap(), b.await.unwrap()];
            let successes = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(successes, 1, "exactly one rotation must win");
            assert!(results
                .iter()
                .any(|r| matches!(r, Err(SessionError::InvalidOrExpired))));
        }
    }

    #[tokio::test]
    async fn test_revoke_one_and_revoke_all() {
        let (manager, store) = test_manager();
        let first = manager.issue(4).await.unwrap();
        manager.issue(4).await.unwrap();
        manager.issue(4).await.unwrap();

        assert!(manager
            .revoke_one(first.refresh_credential.session_id)
            .await
            .unwrap());
        assert!(!manager
            .revoke_one(first.refresh_credential.session_id)
            .await
            .unwrap());
        assert_eq!(store.count_for_user(4).await, 2);

        assert_eq!(manager.revoke(4).await.unwrap(), 2);
        assert_eq!(store.count_for_user(4).await, 0);
    }

    #[tokio::test]
    async fn test_revoke_credential_ignores_malformed_input() {
        let (manager, store) = test_manager();
        let issued = manager.issue(6).await.unwrap();

        assert!(!manager.revoke_credential("garbage").await.unwrap());
        assert_eq!(store.count_for_user(6).await, 1);

        assert!(manager
            .revoke_credential(&issued.refresh_credential.to_string())
            .await
            .unwrap());
        assert_eq!(store.count_for_user(6).await, 0);
    }
}
