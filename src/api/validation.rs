//! Input validation for API requests.
//!
//! Each validator checks one field and returns a human-readable message on
//! failure. To collect several failures into one ApiError, feed the results
//! into the `ValidationErrorBuilder` from the `error` module.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_USER_NAME_LEN: usize = 80;
pub const MAX_EMAIL_LEN: usize = 120;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

lazy_static! {
    /// Something, an @, something, a dot, something. No whitespace anywhere.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

/// Validate a required, length-bounded text field such as a name or title
pub fn validate_required(label: &str, value: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }

    if value.chars().count() > max_len {
        return Err(format!(
            "{} is too long (max {} characters)",
            label, max_len
        ));
    }

    Ok(())
}

/// Validate a user's display name
pub fn validate_user_name(name: &str) -> Result<(), String> {
    validate_required("Name", name, MAX_USER_NAME_LEN)
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(format!(
            "Email is too long (max {} characters)",
            MAX_EMAIL_LEN
        ));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    Ok(())
}

/// Validate an optional free-text description
pub fn validate_description(description: &Option<String>) -> Result<(), String> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(format!(
            "Description is too long (max {} characters)",
            MAX_DESCRIPTION_LEN
        )),
        _ => Ok(()),
    }
}

/// Validate an ISO calendar date (`YYYY-MM-DD`)
pub fn validate_release_date(date: &Option<String>) -> Result<(), String> {
    if let Some(d) = date {
        if NaiveDate::parse_from_str(d, "%Y-%m-%d").is_err() {
            return Err("Release date must be a date in YYYY-MM-DD format".to_string());
        }
    }

    Ok(())
}

/// Parse an RFC 3339 timestamp and normalize it to UTC
pub fn parse_timestamp(label: &str, value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("{} must be an RFC 3339 timestamp", label))
}

/// Check that a session does not end before it starts
pub fn validate_session_window(
    start: &DateTime<Utc>,
    end: Option<&DateTime<Utc>>,
) -> Result<(), String> {
    match end {
        Some(end) if end < start => Err("End time cannot be before start time".to_string()),
        _ => Ok(()),
    }
}

/// Validate a score value
pub fn validate_score_value(value: i64) -> Result<(), String> {
    if value < 0 {
        return Err("Score value cannot be negative".to_string());
    }

    Ok(())
}
