//! Client-held refresh credential.
//!
//! The credential is the string `"{session_id}:{secret}"`. Carrying the session
//! id in clear lets the server fetch the one candidate record by primary key
//! before doing any hash work; the secret is only ever stored hashed.

use std::fmt;

use crate::types::SessionId;

/// Separator between the session id and the plaintext secret.
pub const SEPARATOR: char = ':';

/// Why a presented credential could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialFormatError {
    #[error("credential is missing the ':' separator")]
    MissingSeparator,

    #[error("credential has an empty session id or secret")]
    EmptyPart,

    #[error("credential session id is not a valid UUID")]
    InvalidSessionId,
}

/// A parsed refresh credential.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshCredential {
    pub session_id: SessionId,
    pub secret: String,
}

impl RefreshCredential {
    pub fn new(session_id: SessionId, secret: impl Into<String>) -> Self {
        Self {
            session_id,
            secret: secret.into(),
        }
    }

    /// Split a raw credential into its session id and secret.
    ///
    /// Only the first separator is significant. Surrounding whitespace is not
    /// trimmed: cookie values arrive verbatim and anything else is malformed.
    pub fn parse(raw: &str) -> Result<Self, CredentialFormatError> {
        let (id, secret) = raw
            .split_once(SEPARATOR)
            .ok_or(CredentialFormatError::MissingSeparator)?;

        if id.is_empty() || secret.is_empty() {
            return Err(CredentialFormatError::EmptyPart);
        }

        let session_id =
            SessionId::parse_str(id).map_err(|_| CredentialFormatError::InvalidSessionId)?;

        Ok(Self::new(session_id, secret))
    }
}

impl fmt::Display for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.session_id, self.secret)
    }
}

// Keep the secret out of logs.
impl fmt::Debug for RefreshCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCredential")
            .field("session_id", &self.session_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
