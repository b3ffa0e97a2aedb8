//! Account input normalization and validation.

use validator::ValidateEmail;

use crate::error::CoreError;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Canonical form used for storage and lookup: trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Reject an email address that is not syntactically valid.
///
/// Expects an already-normalized address.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.is_empty() || !email.validate_email() {
        return Err(CoreError::Validation(
            "Please use a valid email address".into(),
        ));
    }
    Ok(())
}

/// Validate that a password meets minimum strength requirements.
///
/// Currently enforces a minimum character length.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), CoreError> {
    if password.chars().count() < min_length {
        return Err(CoreError::Validation(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_valid_email_accepted() {
        assert!(validate_email("a@b.com").is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        for bad in ["", "plainaddress", "@missing-local.org", "two@@at.com"] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_password_too_short() {
        let result = validate_password_strength("short", MIN_PASSWORD_LENGTH);
        match result {
            Err(CoreError::Validation(msg)) => {
                assert!(msg.contains("at least 8 characters"), "got {msg}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_password_meets_minimum() {
        assert!(validate_password_strength("longenough1", MIN_PASSWORD_LENGTH).is_ok());
        assert!(validate_password_strength("exactly8", MIN_PASSWORD_LENGTH).is_ok());
    }
}
