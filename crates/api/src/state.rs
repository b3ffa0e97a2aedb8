use std::sync::Arc;

use turnstile_db::store::{SessionStore, UserStore};
use turnstile_db::DbPool;

use crate::auth::jwt::TokenCodec;
use crate::auth::session::SessionManager;
use crate::auth::verifier::{BearerTokenVerifier, PasswordVerifier};
use crate::config::{ConfigError, ServerConfig};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, when running against Postgres. Only used for health checks.
    pub pool: Option<DbPool>,
    /// Credential store.
    pub users: Arc<dyn UserStore>,
    /// Refresh session lifecycle.
    pub sessions: Arc<SessionManager>,
    /// Email/password login strategy.
    pub password_verifier: Arc<PasswordVerifier>,
    /// Bearer access token strategy.
    pub bearer_verifier: Arc<BearerTokenVerifier>,
}

impl AppState {
    /// Wire the auth components over the given stores.
    ///
    /// Fails if the token codec cannot be built from `config.jwt`.
    pub fn new(
        config: ServerConfig,
        pool: Option<DbPool>,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self, ConfigError> {
        let codec = Arc::new(TokenCodec::new(&config.jwt)?);
        let sessions = Arc::new(SessionManager::new(
            session_store,
            Arc::clone(&codec),
            config.jwt.refresh_ttl(),
        ));

        Ok(Self {
            pool,
            password_verifier: Arc::new(PasswordVerifier::new(Arc::clone(&users))),
            bearer_verifier: Arc::new(BearerTokenVerifier::new(codec)),
            users,
            sessions,
            config: Arc::new(config),
        })
    }
}
