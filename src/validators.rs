/// Input validators for account fields

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_LOCAL_PART_LENGTH: usize = 64;
// Keeps a single request from pinning a worker inside Argon2
const MAX_PASSWORD_LENGTH: usize = 1024;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > MAX_LOCAL_PART_LENGTH {
            return Err(ValidationError::InvalidFormat("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Password presence and size check. Passwords are otherwise free-form.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert_eq!(is_valid_email("walt@breakingbad.com").unwrap(), "walt@breakingbad.com");
        assert_eq!(is_valid_email("  saul@bcs.io ").unwrap(), "saul@bcs.io");
        assert!(is_valid_email("first.last+tag@sub.example.org").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        let invalid = ["", "   ", "notanemail", "user@", "@example.com", "user@@example.com"];
        for email in invalid {
            assert!(is_valid_email(email).is_err(), "accepted {:?}", email);
        }
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            is_valid_email(&email),
            Err(ValidationError::TooLong(_, MAX_EMAIL_LENGTH))
        ));
    }

    #[test]
    fn test_local_part_too_long() {
        let email = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&email).is_err());
    }

    #[test]
    fn test_password_checks() {
        assert!(is_valid_password("04234").is_ok());
        assert!(matches!(
            is_valid_password(""),
            Err(ValidationError::EmptyField(_))
        ));
        assert!(is_valid_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
