//! Credential verifiers.
//!
//! Each authentication strategy implements [`Verifier`] and resolves a
//! presented credential to a user id. Handlers and extractors hold the
//! concrete verifier they need; there is no global strategy registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use turnstile_core::error::CoreError;
use turnstile_core::types::DbId;
use turnstile_core::validation::normalize_email;
use turnstile_db::store::UserStore;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::check_login_password;
use crate::error::AppError;

/// Generic login failure. Unknown email and wrong password are not distinguished.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// A way of proving identity.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// What the caller presents.
    type Credentials: ?Sized + Sync;

    /// Resolve `credentials` to the authenticated user's id.
    async fn check(&self, credentials: &Self::Credentials) -> Result<DbId, AppError>;
}

/// Email and password as submitted to the login endpoint.
#[derive(Deserialize)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Checks an email/password pair against the credential store.
pub struct PasswordVerifier {
    users: Arc<dyn UserStore>,
}

impl PasswordVerifier {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Verifier for PasswordVerifier {
    type Credentials = PasswordCredentials;

    async fn check(&self, credentials: &PasswordCredentials) -> Result<DbId, AppError> {
        let email = normalize_email(&credentials.email);
        let user = self.users.find_by_email(&email).await?;

        let valid = check_login_password(
            &credentials.password,
            user.as_ref().map(|u| u.password_hash.as_str()),
        )
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

        let user = match user {
            Some(user) if valid => user,
            Some(user) => {
                tracing::debug!(user_id = user.id, "Login rejected: wrong password");
                return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
            }
            None => {
                tracing::debug!("Login rejected: unknown email");
                return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
            }
        };

        Ok(user.id)
    }
}

/// Checks a bearer access token with the token codec.
pub struct BearerTokenVerifier {
    codec: Arc<TokenCodec>,
}

impl BearerTokenVerifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

#[async_trait]
impl Verifier for BearerTokenVerifier {
    type Credentials = str;

    async fn check(&self, token: &str) -> Result<DbId, AppError> {
        let claims = self.codec.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            e
        })?;
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use turnstile_db::models::user::CreateUser;
    use turnstile_db::store::MemoryUserStore;

    use super::*;
    use crate::auth::jwt::{JwtConfig, TokenError};
    use crate::auth::password::hash_password;

    async fn store_with_user(email: &str, password: &str) -> (Arc<MemoryUserStore>, DbId) {
        let users = Arc::new(MemoryUserStore::new());
        let user = users
            .create(&CreateUser {
                email: email.to_string(),
                password_hash: hash_password(password).unwrap(),
            })
            .await
            .unwrap();
        (users, user.id)
    }

    fn credentials(email: &str, password: &str) -> PasswordCredentials {
        PasswordCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_password_verifier_accepts_normalized_email() {
        let (users, id) = store_with_user("a@b.com", "longenough1").await;
        let verifier = PasswordVerifier::new(users);

        let result = verifier
            .check(&credentials("  A@B.com ", "longenough1"))
            .await
            .unwrap();
        assert_eq!(result, id);
    }

    #[tokio::test]
    async fn test_password_verifier_rejects_wrong_password_and_unknown_email() {
        let (users, _) = store_with_user("a@b.com", "longenough1").await;
        let verifier = PasswordVerifier::new(users);

        for (email, password) in [("a@b.com", "wrong-password"), ("nobody@b.com", "longenough1")] {
            let err = verifier
                .check(&credentials(email, password))
                .await
                .unwrap_err();
            assert_matches!(err, AppError::Core(CoreError::Unauthorized(ref msg)) if msg == INVALID_CREDENTIALS);
        }
    }

    #[tokio::test]
    async fn test_bearer_verifier() {
        let codec = Arc::new(
            TokenCodec::new(&JwtConfig {
                access_secret: "verifier-access".to_string(),
                refresh_secret: "verifier-refresh".to_string(),
                access_token_expiry_mins: 15,
                refresh_token_expiry_days: 7,
            })
            .unwrap(),
        );
        let token = codec.mint_access(12).unwrap();
        let verifier = BearerTokenVerifier::new(codec);

        assert_eq!(verifier.check(token.as_str()).await.unwrap(), 12);
        assert_matches!(
            verifier.check("garbage").await,
            Err(AppError::Token(TokenError::Invalid))
        );
    }
}
