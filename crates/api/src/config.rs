use std::str::FromStr;

use axum::http::HeaderValue;
use axum_extra::extract::cookie::SameSite;

use crate::auth::jwt::JwtConfig;

/// Configuration could not be assembled from the environment.
///
/// Any of these aborts startup; the server never runs on defaults for a
/// required value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty value")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Attributes applied to the refresh-token cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieConfig {
    /// Set the `Secure` attribute (production only).
    pub secure: bool,
    /// `SameSite` policy (default: `Strict`).
    pub same_site: SameSite,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the signing secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `WEB_URL`.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Postgres connection string. When unset the server runs on in-memory stores.
    pub database_url: Option<String>,
    /// How often expired refresh sessions are swept, in seconds (default: `3600`).
    pub session_sweep_interval_secs: u64,
    /// Refresh cookie attributes.
    pub cookie: CookieConfig,
    /// Token signing configuration (secrets, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `WEB_URL`                     | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `DATABASE_URL`                | unset (in-memory stores)   |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | `3600`                     |
    /// | `APP_ENV`                     | `development`              |
    /// | `COOKIE_SAME_SITE`            | `strict`                   |
    ///
    /// See [`JwtConfig::from_lookup`] for the token variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000)?;

        let cors_origins = lookup("WEB_URL")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                    var: "WEB_URL",
                    value: origin.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let request_timeout_secs = parse_nonzero_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let session_sweep_interval_secs =
            parse_nonzero_or(&lookup, "SESSION_SWEEP_INTERVAL_SECS", 3600)?;
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let production = lookup("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let same_site = match lookup("COOKIE_SAME_SITE") {
            None => SameSite::Strict,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "strict" => SameSite::Strict,
                "lax" => SameSite::Lax,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "COOKIE_SAME_SITE",
                        value,
                    })
                }
            },
        };

        let jwt = JwtConfig::from_lookup(&lookup)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            session_sweep_interval_secs,
            cookie: CookieConfig {
                secure: production,
                same_site,
            },
            jwt,
        })
    }
}

/// Read a required variable, rejecting empty or whitespace-only values.
pub(crate) fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_nonzero_or<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".into(),
        }),
        n => Ok(n),
    }
}
