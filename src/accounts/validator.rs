//! Input checks for account requests.

use regex::Regex;

use crate::errors::{ErrorDetails, FieldErrors};

pub const INVALID_EMAIL: &str = "Invalid email format";
pub const WEAK_PASSWORD: &str = "Password must be at least 6 characters with letter and number";

pub fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").is_ok_and(|re| re.is_match(email))
}

/// At least six characters, with at least one letter and one digit.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 6
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Names of required fields that are absent or blank, in the order given.
pub fn missing_fields(fields: &[(&str, Option<&str>)]) -> Option<ErrorDetails> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| (*name).to_string())
        .collect();

    if missing.is_empty() {
        None
    } else {
        Some(ErrorDetails::Missing { missing })
    }
}

/// Every format problem in a registration, keyed by field.
pub fn registration_errors(email: &str, password: &str) -> Option<ErrorDetails> {
    let mut errors = FieldErrors::new();
    if !is_valid_email(email) {
        errors.insert("email".into(), INVALID_EMAIL.into());
    }
    if !is_valid_password(password) {
        errors.insert("password".into(), WEAK_PASSWORD.into());
    }

    if errors.is_empty() {
        None
    } else {
        Some(ErrorDetails::Fields(errors))
    }
}

/// Trim and strip angle brackets.
pub fn sanitize(value: &str) -> String {
    value.trim().replace(['<', '>'], "")
}
