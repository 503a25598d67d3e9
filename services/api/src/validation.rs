//! Input validation utilities
//!
//! Validation and hashing are explicit sequential steps in the signup path;
//! there is no hook dispatch. Each function returns a field-specific message
//! suitable for a 400 response.

use regex::Regex;
use std::sync::OnceLock;

/// Trim and lowercase an email address before any lookup or insert
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a required free-text field
pub fn validate_required(field: &str, value: Option<&str>) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(format!("{field} is required")),
    }
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, dots, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate that the confirmation supplied at creation matches the password.
/// The confirmation value is discarded after this check, never stored.
pub fn validate_password_confirm(password: &str, confirm: Option<&str>) -> Result<(), String> {
    match confirm {
        Some(c) if c == password => Ok(()),
        Some(_) => Err("Passwords do not match".to_string()),
        None => Err("Password confirmation is required".to_string()),
    }
}

/// Validate comment text; returns the trimmed text
pub fn validate_comment_text(text: Option<&str>) -> Result<String, String> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
        _ => Err("Comment text is required".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(
            validate_required("Title", Some("  Hello  ")),
            Ok("Hello".to_string())
        );
        assert_eq!(
            validate_required("Title", Some("   ")),
            Err("Title is required".to_string())
        );
        assert_eq!(
            validate_required("Title", None),
            Err("Title is required".to_string())
        );
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("alice.smith").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("has spaces").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user@sub.example.co.uk").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_validate_password_minimum_length() {
        // 7 characters, one below the minimum
        let err = validate_password("abc1234").unwrap_err();
        assert!(err.contains("at least 8 characters"));

        assert!(validate_password("abc12345").is_ok());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_password_confirm() {
        assert!(validate_password_confirm("secret123", Some("secret123")).is_ok());
        assert_eq!(
            validate_password_confirm("secret123", Some("different")),
            Err("Passwords do not match".to_string())
        );
        assert!(validate_password_confirm("secret123", None).is_err());
    }

    #[test]
    fn test_validate_comment_text() {
        assert_eq!(
            validate_comment_text(Some("  Nice post!  ")),
            Ok("Nice post!".to_string())
        );
        assert!(validate_comment_text(Some("   ")).is_err());
        assert!(validate_comment_text(Some("")).is_err());
        assert!(validate_comment_text(None).is_err());
    }
}
