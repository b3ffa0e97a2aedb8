//! Postgres-backed stores delegating to the repositories.

use async_trait::async_trait;
use turnstile_core::types::{DbId, SessionId};

use crate::models::session::{CreateRefreshSession, RefreshSession};
use crate::models::user::{CreateUser, User};
use crate::repositories::user_repo::EMAIL_UNIQUE_CONSTRAINT;
use crate::repositories::{SessionRepo, UserRepo};
use crate::store::{SessionStore, StoreError, UserStore};
use crate::DbPool;

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// [`SessionStore`] over the `refresh_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, input: &CreateRefreshSession) -> Result<RefreshSession, StoreError> {
        Ok(SessionRepo::create(&self.pool, input).await?)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<RefreshSession>, StoreError> {
        Ok(SessionRepo::find_live_by_id(&self.pool, id).await?)
    }

    async fn delete_by_id(&self, id: SessionId) -> Result<bool, StoreError> {
        Ok(SessionRepo::delete(&self.pool, id).await?)
    }

    async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_all_for_user(&self.pool, user_id).await?)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_expired(&self.pool).await?)
    }
}

/// [`UserStore`] over the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError> {
        UserRepo::create(&self.pool, input)
            .await
            .map_err(classify_user_insert_error)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }
}

/// Turn a unique violation on the email constraint into [`StoreError::DuplicateEmail`].
fn classify_user_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
            && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT)
        {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Database(err)
}
