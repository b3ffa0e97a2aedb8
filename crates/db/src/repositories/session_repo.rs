//! Repository for the `refresh_sessions` table.

use sqlx::PgPool;
use turnstile_core::types::{DbId, SessionId};

use crate::models::session::{CreateRefreshSession, RefreshSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, secret_hash, expires_at, created_at";

/// Provides create, lookup, and delete operations for refresh sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row with its generated id.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRefreshSession,
    ) -> Result<RefreshSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_sessions (user_id, secret_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshSession>(&query)
            .bind(input.user_id)
            .bind(&input.secret_hash)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a live session by primary key.
    ///
    /// Rows past `expires_at` are treated as absent even before the sweep
    /// removes them.
    pub async fn find_live_by_id(
        pool: &PgPool,
        id: SessionId,
    ) -> Result<Option<RefreshSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM refresh_sessions
             WHERE id = $1
               AND expires_at > NOW()"
        );
        sqlx::query_as::<_, RefreshSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a single session. Returns `true` only if this call removed the row.
    ///
    /// Postgres row locking makes this the check-and-delete point for
    /// concurrent rotations of the same credential.
    pub async fn delete(pool: &PgPool, id: SessionId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session belonging to a user. Returns the count removed.
    pub async fn delete_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions past their expiry. Returns the count removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
