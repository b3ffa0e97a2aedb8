//! Storage traits consumed by the session core and the auth gateway.
//!
//! - [`SessionStore`] -- refresh session records with expiry semantics.
//! - [`UserStore`] -- the credential store (accounts and password hashes).
//!
//! Two implementations of each are provided: [`postgres`] for deployments
//! and [`memory`] for tests and running without a database.

use async_trait::async_trait;
use turnstile_core::types::{DbId, SessionId};

use crate::models::session::{CreateRefreshSession, RefreshSession};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::{MemorySessionStore, MemoryUserStore};
pub use postgres::{PgSessionStore, PgUserStore};

/// Errors surfaced by any store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The email is already registered.
    #[error("a user with this email already exists")]
    DuplicateEmail,

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for refresh session records.
///
/// Implementations must uphold two rules:
///
/// - `find_by_id` never returns a record whose `expires_at` has passed.
/// - `delete_by_id` is atomic per record: of several concurrent calls for the
///   same id, exactly one observes `true`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new record and return it with its store-generated id.
    async fn create(&self, input: &CreateRefreshSession) -> Result<RefreshSession, StoreError>;

    /// Look up a live record by id.
    async fn find_by_id(&self, id: SessionId) -> Result<Option<RefreshSession>, StoreError>;

    /// Delete one record. Returns `true` if this call removed it.
    async fn delete_by_id(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Delete all records of a user. Returns the number removed.
    async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, StoreError>;

    /// Remove expired records. Returns the number removed.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account. Fails with [`StoreError::DuplicateEmail`] if the
    /// normalized email is taken.
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}
