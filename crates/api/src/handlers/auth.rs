//! Handlers for the `/auth` resource (register, login, refresh, logout, profile).
//!
//! The refresh credential travels only in the `refreshToken` cookie; the
//! access token travels only in response bodies and `Authorization` headers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use turnstile_core::error::CoreError;
use turnstile_core::types::DbId;
use turnstile_core::validation::{
    normalize_email, validate_email, validate_password_strength, MIN_PASSWORD_LENGTH,
};
use turnstile_db::models::user::CreateUser;

use crate::auth::password::hash_password;
use crate::auth::session::IssuedSession;
use crate::auth::verifier::{PasswordCredentials, Verifier};
use crate::config::CookieConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Name of the cookie carrying the refresh credential.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/auth";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Public user info. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
}

/// Response for `GET /auth/profile`.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
}

/// Body returned by login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/register
///
/// Create an account. Returns 201 with the new user's id and email.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let email = normalize_email(&input.email);
    validate_email(&email)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = state
        .users
        .create(&CreateUser {
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(UserInfo {
            id: user.id,
            email: user.email,
        }),
    ))
}

/// POST /auth/login
///
/// Authenticate with email + password. Returns the access token and sets the
/// refresh cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<PasswordCredentials>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AccessTokenResponse>)> {
    let Json(credentials) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let user_id = state.password_verifier.check(&credentials).await?;
    let issued = state.sessions.issue(user_id).await?;

    tracing::info!(user_id, "User logged in");

    Ok(session_response(&state, jar, issued))
}

/// POST /auth/refresh
///
/// Rotate the refresh credential from the cookie. Any failure clears the
/// cookie and returns the same generic 401.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AccessTokenResponse>), (CookieJar, AppError)> {
    let Some(raw) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned()) else {
        tracing::debug!("Refresh attempted without a cookie");
        let jar = jar.add(removal_cookie(&state.config.cookie));
        return Err((jar, CoreError::Unauthorized("Unauthorized".into()).into()));
    };

    match state.sessions.rotate(&raw).await {
        Ok(issued) => Ok(session_response(&state, jar, issued)),
        Err(e) => {
            let jar = jar.add(removal_cookie(&state.config.cookie));
            Err((jar, e.into()))
        }
    }
}

/// POST /auth/logout
///
/// Revoke the session named by the cookie, if any, and clear the cookie.
/// Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        let raw = cookie.value().to_owned();
        if let Err(e) = state.sessions.revoke_credential(&raw).await {
            // The session stays until it expires or the sweep removes it.
            tracing::error!(error = %e, "Failed to revoke refresh session on logout");
        }
    }

    let jar = jar.add(removal_cookie(&state.config.cookie));
    (jar, Json(MessageResponse { message: "Logged out" }))
}

/// GET /auth/profile
///
/// Return the authenticated user.
pub async fn profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = state
        .users
        .find_by_id(auth_user.user_id)
        .await?
        .ok_or_else(|| CoreError::Unauthorized("User no longer exists".into()))?;

    Ok(Json(ProfileResponse {
        user: UserInfo {
            id: user.id,
            email: user.email,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Set the refresh cookie and return the access token body.
fn session_response(
    state: &AppState,
    jar: CookieJar,
    issued: IssuedSession,
) -> (CookieJar, Json<AccessTokenResponse>) {
    let max_age = time::Duration::seconds(state.sessions.refresh_ttl().num_seconds());
    let cookie = refresh_cookie(
        &state.config.cookie,
        issued.refresh_credential.to_string(),
        max_age,
    );

    (
        jar.add(cookie),
        Json(AccessTokenResponse {
            access_token: issued.access_token,
        }),
    )
}

fn refresh_cookie(config: &CookieConfig, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(config.secure)
        .same_site(config.same_site)
        .max_age(max_age)
        .build()
}

/// Cookie with the same attributes as the refresh cookie, already expired.
fn removal_cookie(config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = refresh_cookie(config, String::new(), time::Duration::ZERO);
    cookie.make_removal();
    cookie
}
