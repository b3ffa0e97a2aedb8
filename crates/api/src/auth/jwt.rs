//! Token codec: JWT access tokens and refresh-secret hashing.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload and are
//! never stored. Refresh secrets are random 256-bit strings; only an
//! HMAC-SHA256 of each (keyed with the refresh secret) is persisted, so a
//! database leak alone does not allow forging or replaying sessions.

use std::fmt;

use chrono::{Duration, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use turnstile_core::types::DbId;
use uuid::Uuid;

use crate::config::{parse_or, required, ConfigError};

type HmacSha256 = Hmac<Sha256>;

/// The only algorithm accepted for access tokens.
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Entropy of a refresh secret, in bytes.
const REFRESH_SECRET_BYTES: usize = 32;

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh session expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

/// Upper bound on the access token lifetime (one day).
const MAX_ACCESS_EXPIRY_MINS: i64 = 24 * 60;
/// Upper bound on the refresh session lifetime (ten years).
const MAX_REFRESH_EXPIRY_DAYS: i64 = 3650;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Access token verification failures.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access token has expired")]
    Expired,

    /// Bad signature, tampered payload, wrong algorithm, or malformed token.
    #[error("access token is invalid")]
    Invalid,

    #[error("failed to sign access token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// Configuration for token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify access tokens.
    pub access_secret: String,
    /// Key for hashing refresh secrets. Distinct from the access secret.
    pub refresh_secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh session lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// Load token configuration through a variable lookup.
    ///
    /// | Env Var                     | Required | Default |
    /// |-----------------------------|----------|---------|
    /// | `JWT_ACCESS_SECRET`         | **yes**  | --      |
    /// | `JWT_REFRESH_SECRET`        | **yes**  | --      |
    /// | `ACCESS_TOKEN_EXPIRY_MINS`  | no       | `15`    |
    /// | `REFRESH_TOKEN_EXPIRY_DAYS` | no       | `7`     |
    ///
    /// Lifetimes must be positive and no longer than one day (access) or ten
    /// years (refresh).
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            access_secret: required(lookup, "JWT_ACCESS_SECRET")?,
            refresh_secret: required(lookup, "JWT_REFRESH_SECRET")?,
            access_token_expiry_mins: parse_lifetime(
                lookup,
                "ACCESS_TOKEN_EXPIRY_MINS",
                DEFAULT_ACCESS_EXPIRY_MINS,
                MAX_ACCESS_EXPIRY_MINS,
                TimeDelta::try_minutes,
            )?,
            refresh_token_expiry_days: parse_lifetime(
                lookup,
                "REFRESH_TOKEN_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
                MAX_REFRESH_EXPIRY_DAYS,
                TimeDelta::try_days,
            )?,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

/// Parse a lifetime in `1..=max` units that converts to a [`TimeDelta`].
fn parse_lifetime<F>(
    lookup: &F,
    var: &'static str,
    default: i64,
    max: i64,
    to_delta: fn(i64) -> Option<TimeDelta>,
) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: i64 = parse_or(lookup, var, default)?;
    if value <= 0 || value > max || to_delta(value).is_none() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        });
    }
    Ok(value)
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_token_expiry_mins", &self.access_token_expiry_mins)
            .field("refresh_token_expiry_days", &self.refresh_token_expiry_days)
            .finish()
    }
}

/// Mints and verifies access tokens and hashes refresh secrets.
///
/// Built once at startup; construction fails if either secret is empty.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    refresh_mac: HmacSha256,
    access_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        if config.access_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_ACCESS_SECRET"));
        }
        if config.refresh_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_REFRESH_SECRET"));
        }

        let refresh_mac = HmacSha256::new_from_slice(config.refresh_secret.as_bytes()).map_err(
            |_| ConfigError::Invalid {
                var: "JWT_REFRESH_SECRET",
                value: "<redacted>".into(),
            },
        )?;

        // Pinning the algorithm rejects tokens whose header names anything else.
        let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            validation,
            refresh_mac,
            access_ttl: config.access_ttl(),
        })
    }

    /// Configured access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign a token for `sub` that expires `ttl` from now.
    pub fn mint(&self, sub: DbId, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            exp: now + ttl.num_seconds(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(ACCESS_TOKEN_ALGORITHM),
            &claims,
            &self.encoding_key,
        )
        .map_err(TokenError::Encode)
    }

    /// Sign a token for `sub` with the configured access TTL.
    pub fn mint_access(&self, sub: DbId) -> Result<String, TokenError> {
        self.mint(sub, self.access_ttl)
    }

    /// Check signature, algorithm, and expiry, returning the embedded [`Claims`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        // The library accepts `exp == now`; a token is dead at its expiry instant.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// Generate a fresh refresh secret.
    ///
    /// Returns `(plaintext, hash)`. The plaintext goes to the client; only the
    /// hash is persisted.
    pub fn generate_refresh_secret(&self) -> (String, String) {
        let mut bytes = [0u8; REFRESH_SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let plaintext: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let hash = self.hash_refresh_secret(&plaintext);
        (plaintext, hash)
    }

    /// Keyed hex digest of a refresh secret.
    pub fn hash_refresh_secret(&self, secret: &str) -> String {
        let mut mac = self.refresh_mac.clone();
        mac.update(secret.as_bytes());
        format!("{:x}", mac.finalize().into_bytes())
    }

    /// Constant-time comparison of a presented secret against a stored hash.
    pub fn verify_refresh_secret(&self, secret: &str, stored_hash: &str) -> bool {
        let computed = self.hash_refresh_secret(secret);
        computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
    }
}
