//! Common validation utilities for registration input.

use validator::ValidationError;

/// Number of digits a normalized Indian mobile number carries.
pub const PHONE_DIGITS: usize = 10;

/// Normalizes a phone number: strips every non-digit character and keeps the
/// last 10 digits.
///
/// Inputs like `+91 98765-43210` normalize to `9876543210`. Fewer than 10
/// digits after stripping is a validation failure.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < PHONE_DIGITS {
        let mut err = ValidationError::new("phone_digits");
        err.message = Some("Phone number must contain at least 10 digits".into());
        return Err(err);
    }

    Ok(digits[digits.len() - PHONE_DIGITS..].to_string())
}

/// Validates that a free-text note is non-blank.
pub fn validate_note(note: &str) -> Result<(), ValidationError> {
    if note.trim().is_empty() {
        let mut err = ValidationError::new("note_empty");
        err.message = Some("Verification note cannot be empty".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_plain() {
        assert_eq!(normalize_phone("9876543210").unwrap(), "9876543210");
    }

    #[test]
    fn test_normalize_phone_strips_formatting() {
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("(987) 654 3210").unwrap(), "9876543210");
    }

    #[test]
    fn test_normalize_phone_keeps_last_ten() {
        // Country-prefixed numbers keep the trailing 10 digits
        assert_eq!(normalize_phone("919876543210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("00919876543210").unwrap(), "9876543210");
    }

    #[test]
    fn test_normalize_phone_too_short() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("987-654-321").is_err()); // 9 digits
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("no digits at all").is_err());
    }

    #[test]
    fn test_normalize_phone_error_message() {
        let err = normalize_phone("123").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Phone number must contain at least 10 digits"
        );
    }

    #[test]
    fn test_validate_note() {
        assert!(validate_note("payment screenshot checked").is_ok());
        assert!(validate_note("").is_err());
        assert!(validate_note("   \t\n").is_err());
    }
}
