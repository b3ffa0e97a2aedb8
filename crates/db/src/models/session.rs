//! Refresh session model and DTOs.

use sqlx::FromRow;
use turnstile_core::types::{DbId, SessionId, Timestamp};

/// A refresh session row from the `refresh_sessions` table.
///
/// A row either exists and is live, or it does not exist. There is no
/// revoked flag: deleting the row is revocation.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshSession {
    pub id: SessionId,
    pub user_id: DbId,
    /// Keyed one-way hash of the client-held secret, never the secret itself.
    pub secret_hash: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl RefreshSession {
    /// Whether the session has passed its expiry as of `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// DTO for creating a new refresh session.
#[derive(Debug, Clone)]
pub struct CreateRefreshSession {
    pub user_id: DbId,
    pub secret_hash: String,
    pub expires_at: Timestamp,
}
