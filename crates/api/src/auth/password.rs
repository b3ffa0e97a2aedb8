//! Argon2id password hashing and login checks.
//!
//! Hashes are stored as PHC strings, so parameters and salt travel with them.
//! [`check_login_password`] spends the same Argon2 work whether or not the
//! account exists, so response timing does not reveal registered emails.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a plaintext password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Check a login attempt against the account's hash, if there is an account.
///
/// With no account the password is verified against a fixed dummy hash and
/// the result is always `false`.
pub fn check_login_password(password: &str, stored_hash: Option<&str>) -> Result<bool, Error> {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            let dummy = dummy_hash()?;
            verify_password(password, dummy)?;
            Ok(false)
        }
    }
}

fn dummy_hash() -> Result<&'static str, Error> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password("turnstile-dummy-password")?;
    Ok(DUMMY.get_or_init(|| hash).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("longenough1").expect("hashing should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("longenough1"));
        assert!(verify_password("longenough1", &hash).unwrap());
        assert!(!verify_password("longenough2", &hash).unwrap());
    }

    #[test]
    fn test_same_password_salted_differently() {
        let a = hash_password("longenough1").unwrap();
        let b = hash_password("longenough1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_missing_account_never_matches() {
        assert!(!check_login_password("turnstile-dummy-password", None).unwrap());
        assert!(!check_login_password("longenough1", None).unwrap());

        let hash = hash_password("longenough1").unwrap();
        assert!(check_login_password("longenough1", Some(&hash)).unwrap());
    }
}
