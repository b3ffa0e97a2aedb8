#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderValue, Method, Request, Response};
use axum::Router;
use axum_extra::extract::cookie::SameSite;
use http_body_util::BodyExt;
use tower::ServiceExt;

use turnstile_api::auth::jwt::JwtConfig;
use turnstile_api::config::{CookieConfig, ServerConfig};
use turnstile_api::router::build_app_router;
use turnstile_api::state::AppState;
use turnstile_db::store::{MemorySessionStore, MemoryUserStore, SessionStore};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        database_url: None,
        session_sweep_interval_secs: 3600,
        cookie: CookieConfig {
            secure: false,
            same_site: SameSite::Strict,
        },
        jwt: JwtConfig {
            access_secret: "integration-access-secret".to_string(),
            refresh_secret: "integration-refresh-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

/// Stores behind a test app, kept so tests can inspect them.
pub struct TestStores {
    pub users: Arc<MemoryUserStore>,
    pub sessions: Arc<MemorySessionStore>,
}

/// Build the full application router over fresh in-memory stores.
///
/// Uses the same [`build_app_router`] as production, so tests exercise the
/// whole middleware stack.
pub fn build_test_app() -> (Router, TestStores) {
    let users = Arc::new(MemoryUserStore::new());
    let sessions = Arc::new(MemorySessionStore::new());

    let state = AppState::new(test_config(), None, users.clone(), sessions.clone())
        .expect("test config is valid");

    (build_app_router(state), TestStores { users, sessions })
}

/// Build the application router over a caller-supplied session store.
pub fn build_test_app_with_sessions(sessions: Arc<dyn SessionStore>) -> Router {
    let users = Arc::new(MemoryUserStore::new());
    let state =
        AppState::new(test_config(), None, users, sessions).expect("test config is valid");
    build_app_router(state)
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST with no body and an optional `refreshToken` cookie.
pub async fn post_with_cookie(app: Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(value) = cookie {
        builder = builder.header(COOKIE, format!("refreshToken={value}"));
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// The raw `Set-Cookie` header for `refreshToken`, if the response sets one.
pub fn refresh_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(str::to_string)
}

/// The value of the `refreshToken` cookie set by the response.
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    let header = refresh_set_cookie(response)?;
    let pair = header.split(';').next()?;
    pair.strip_prefix("refreshToken=").map(str::to_string)
}

pub async fn register(app: Router, email: &str, password: &str) -> Response<Body> {
    post_json(
        app,
        "/auth/register",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await
}

pub async fn login(app: Router, email: &str, password: &str) -> Response<Body> {
    post_json(
        app,
        "/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await
}
