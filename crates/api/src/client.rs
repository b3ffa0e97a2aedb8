//! Client-side session state.
//!
//! [`SessionClient`] holds the current access token and coordinates refreshes:
//! when several callers hit an expired token at once, exactly one refresh
//! request is made and the others wait for its result.
//!
//! The refresh transport is a [`TokenRefresher`]; [`HttpRefresher`] talks to
//! this service's `/auth` endpoints with a cookie-holding `reqwest` client.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

/// Client-side failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An API call was rejected with 401.
    #[error("request was not authorized")]
    Unauthorized,

    /// The refresh credential was rejected; the user must log in again.
    #[error("session expired")]
    SessionExpired,

    /// A concurrent refresh this caller was waiting on did not succeed.
    #[error("refresh in progress failed")]
    RefreshFailed,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Obtains a new access token using whatever refresh credential the transport holds.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, ClientError>;
}

type Waiter = oneshot::Sender<Option<String>>;

#[derive(Default)]
struct RefreshState {
    access_token: Option<String>,
    refreshing: bool,
    waiters: Vec<Waiter>,
}

/// Access token holder with single-flight refresh.
pub struct SessionClient<R> {
    refresher: R,
    state: Mutex<RefreshState>,
}

impl<R: TokenRefresher> SessionClient<R> {
    pub fn new(refresher: R) -> Self {
        Self {
            refresher,
            state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn refresher(&self) -> &R {
        &self.refresher
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        self.lock().access_token = Some(token.into());
    }

    /// Forget the access token (logout).
    pub fn clear(&self) {
        self.lock().access_token = None;
    }

    /// Refresh the access token.
    ///
    /// If a refresh is already running, waits for it instead of starting
    /// another one.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let waiting = {
            let mut state = self.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        if let Some(rx) = waiting {
            return match rx.await {
                Ok(Some(token)) => Ok(token),
                _ => Err(ClientError::RefreshFailed),
            };
        }

        let guard = InFlight {
            client: self,
            finished: false,
        };
        let result = self.refresher.refresh().await;
        guard.finish(result.as_ref().ok().cloned());

        match result {
            Ok(token) => {
                tracing::debug!("Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Access token refresh failed");
                Err(e)
            }
        }
    }

    /// Run an authorized call, refreshing and retrying once on 401.
    ///
    /// `call` receives the access token to present. A missing token triggers
    /// a refresh before the first attempt.
    pub async fn authorized<F, Fut, T>(&self, call: F) -> Result<T, ClientError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let token = match self.access_token() {
            Some(token) => token,
            None => self.refresh().await?,
        };

        match call(token).await {
            Err(ClientError::Unauthorized) => {
                let token = self.refresh().await?;
                call(token).await
            }
            other => other,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the running refresh. Dropped without [`InFlight::finish`] (the
/// refreshing future was cancelled), it releases waiters with a failure.
struct InFlight<'a, R: TokenRefresher> {
    client: &'a SessionClient<R>,
    finished: bool,
}

impl<R: TokenRefresher> InFlight<'_, R> {
    fn finish(mut self, token: Option<String>) {
        self.finished = true;
        let waiters = {
            let mut state = self.client.lock();
            state.refreshing = false;
            state.access_token = token.clone();
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            let _ = waiter.send(token.clone());
        }
    }
}

impl<R: TokenRefresher> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.client.lock();
        state.refreshing = false;
        // Dropping the senders wakes every waiter with an error.
        state.waiters.clear();
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenBody {
    access_token: String,
}

/// [`TokenRefresher`] over HTTP.
///
/// The underlying client keeps cookies, so the refresh cookie set by
/// [`HttpRefresher::login`] is presented automatically and rotated on every
/// refresh.
pub struct HttpRefresher {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRefresher {
    /// `base_url` is the service root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The cookie-holding HTTP client, for authorized calls.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Log in and return the access token. The refresh cookie is stored.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<AccessTokenBody>().await?.access_token),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            other => Err(ClientError::Status(other.as_u16())),
        }
    }

    /// Revoke the session server-side and drop the refresh cookie.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Status(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<AccessTokenBody>().await?.access_token),
            StatusCode::UNAUTHORIZED => Err(ClientError::SessionExpired),
            other => Err(ClientError::Status(other.as_u16())),
        }
    }
}
