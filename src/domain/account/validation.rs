//! Account validation utilities

use thiserror::Error;

/// Errors that can occur during account validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountValidationError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email exceeds maximum length of {0} characters")]
    EmailTooLong(usize),

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Password is too short. Minimum length is {0} characters")]
    PasswordTooShort(usize),

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),

    #[error("Display name cannot be empty")]
    EmptyDisplayName,

    #[error("Display name exceeds maximum length of {0} characters")]
    DisplayNameTooLong(usize),
}

const MAX_EMAIL_LENGTH: usize = 254;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// Validate an email address
///
/// Rules:
/// - Cannot be empty
/// - Maximum 254 characters
/// - Exactly one '@' with a non-empty local part and a dotted domain
/// - No whitespace
pub fn validate_email(email: &str) -> Result<(), AccountValidationError> {
    if email.is_empty() {
        return Err(AccountValidationError::EmptyEmail);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AccountValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(AccountValidationError::InvalidEmail);
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(AccountValidationError::InvalidEmail);
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(AccountValidationError::InvalidEmail);
    }

    Ok(())
}

/// Validate a raw password
///
/// Rules:
/// - Minimum 8 characters
/// - Maximum 128 characters
pub fn validate_password(password: &str) -> Result<(), AccountValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AccountValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AccountValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Validate a display name
pub fn validate_display_name(name: &str) -> Result<(), AccountValidationError> {
    if name.trim().is_empty() {
        return Err(AccountValidationError::EmptyDisplayName);
    }

    if name.len() > MAX_DISPLAY_NAME_LENGTH {
        return Err(AccountValidationError::DisplayNameTooLong(
            MAX_DISPLAY_NAME_LENGTH,
        ));
    }

    Ok(())
}

/// The local part of an email address, used to derive personal-team slugs
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.domain.org").is_ok());
    }

    #[test]
    fn test_empty_email() {
        assert_eq!(validate_email(""), Err(AccountValidationError::EmptyEmail));
    }

    #[test]
    fn test_email_too_long() {
        let long_email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            validate_email(&long_email),
            Err(AccountValidationError::EmailTooLong(254))
        );
    }

    #[test]
    fn test_invalid_emails() {
        assert_eq!(
            validate_email("no-at-sign"),
            Err(AccountValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("@example.com"),
            Err(AccountValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("alice@"),
            Err(AccountValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("alice@nodot"),
            Err(AccountValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("alice @example.com"),
            Err(AccountValidationError::InvalidEmail)
        );
    }

    #[test]
    fn test_valid_passwords() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_password_too_short() {
        assert_eq!(
            validate_password("1234567"),
            Err(AccountValidationError::PasswordTooShort(8))
        );
    }

    #[test]
    fn test_password_too_long() {
        let long_password = "a".repeat(129);
        assert_eq!(
            validate_password(&long_password),
            Err(AccountValidationError::PasswordTooLong(128))
        );
    }

    #[test]
    fn test_display_name() {
        assert!(validate_display_name("Alice").is_ok());
        assert_eq!(
            validate_display_name("   "),
            Err(AccountValidationError::EmptyDisplayName)
        );
        assert_eq!(
            validate_display_name(&"a".repeat(101)),
            Err(AccountValidationError::DisplayNameTooLong(100))
        );
    }

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("alice@example.com"), "alice");
        assert_eq!(email_local_part("no-at"), "no-at");
    }
}
