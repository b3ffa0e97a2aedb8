//! In-process stores for tests and database-less runs.
//!
//! State lives behind a `tokio::sync::RwLock`; every mutation happens under a
//! single write guard, which is what gives `delete_by_id` its
//! exactly-one-winner guarantee.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use turnstile_core::types::{DbId, SessionId};

use crate::models::session::{CreateRefreshSession, RefreshSession};
use crate::models::user::{CreateUser, User};
use crate::store::{SessionStore, StoreError, UserStore};

/// [`SessionStore`] held in a map keyed by session id.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, RefreshSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) records owned by `user_id`.
    pub async fn count_for_user(&self, user_id: DbId) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id && !s.is_expired_at(now))
            .count()
    }

    /// Number of stored records, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, input: &CreateRefreshSession) -> Result<RefreshSession, StoreError> {
        let session = RefreshSession {
            id: SessionId::new_v4(),
            user_id: input.user_id,
            secret_hash: input.secret_hash.clone(),
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<RefreshSession>, StoreError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .filter(|s| !s.is_expired_at(now))
            .cloned())
    }

    async fn delete_by_id(&self, id: SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[derive(Default)]
struct UserTable {
    rows: HashMap<DbId, User>,
    last_id: DbId,
}

/// [`UserStore`] held in a map keyed by user id.
#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        if table.rows.values().any(|u| u.email == input.email) {
            return Err(StoreError::DuplicateEmail);
        }

        table.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: table.last_id,
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}
