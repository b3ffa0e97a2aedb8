//! Authentication primitives.
//!
//! - [`jwt`] -- token codec: access-token minting/verification and refresh-secret hashing.
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`session`] -- refresh session manager: issue, rotate, revoke.
//! - [`verifier`] -- pluggable credential verifiers used by the gateway.

pub mod jwt;
pub mod password;
pub mod session;
pub mod verifier;
