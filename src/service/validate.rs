//! Input Validation
//!
//! Validation and sanitisation of queries, terms and identifiers before
//! they touch the core. Error details describe the rejection without ever
//! echoing the offending input back to the client.

use crate::error::ApiError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_QUERY_LENGTH: usize = 100;
pub const MIN_QUERY_LENGTH: usize = 1;
pub const MAX_TERM_LENGTH: usize = 200;

static ALLOWED_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}\s\-_.]+$").unwrap());

static BLOCKED_QUERY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(script|javascript|vbscript)").unwrap(),
        Regex::new(r"(?i)(<|>|&lt;|&gt;)").unwrap(),
        Regex::new(r"(?i)(union|select|insert|update|delete|drop)").unwrap(),
        Regex::new(r"(?i)(eval|exec|system)").unwrap(),
        Regex::new(r"\$\{.*\}").unwrap(),
        Regex::new(r"\{\{.*\}\}").unwrap(),
    ]
});

static DANGEROUS_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(script|javascript|[<>&])").unwrap());

static COLLAPSE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static STRIP_DANGEROUS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>&"']"#).unwrap());

static USER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-fA-F0-9-]{8,36}$|^[a-zA-Z0-9_-]{3,50}$").unwrap());
static SESSION_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{10,100}$").unwrap());

/// Validates a search query for length, character set and injection
/// patterns.
pub fn validate_query(query: &str) -> Result<(), ApiError> {
    let length = query.chars().count();
    if length > MAX_QUERY_LENGTH {
        return Err(ApiError::validation(
            "Invalid query",
            format!("query exceeds the maximum length of {} characters", MAX_QUERY_LENGTH),
        ));
    }
    if length < MIN_QUERY_LENGTH {
        return Err(ApiError::validation("Invalid query", "query is empty"));
    }

    for c in query.chars() {
        if c.is_control() && c != '\t' && c != '\n' && c != '\r' {
            return Err(ApiError::validation(
                "Invalid query",
                "query contains control characters",
            ));
        }
    }

    for pattern in BLOCKED_QUERY_PATTERNS.iter() {
        if pattern.is_match(query) {
            return Err(ApiError::validation(
                "Invalid query",
                "query contains a suspicious pattern",
            ));
        }
    }

    if !ALLOWED_QUERY.is_match(query) {
        return Err(ApiError::validation(
            "Invalid query",
            "query contains characters outside the allowed set",
        ));
    }

    Ok(())
}

/// Trims, collapses whitespace and strips markup characters.
pub fn sanitize_query(query: &str) -> String {
    let trimmed = query.trim();
    let collapsed = COLLAPSE_WHITESPACE.replace_all(trimmed, " ");
    STRIP_DANGEROUS.replace_all(&collapsed, "").into_owned()
}

/// Validates a suggestion term for admin writes.
pub fn validate_term(term: &str) -> Result<(), ApiError> {
    if term.is_empty() {
        return Err(ApiError::validation("Invalid term", "term is empty"));
    }
    if term.chars().count() > MAX_TERM_LENGTH {
        return Err(ApiError::validation(
            "Invalid term",
            format!("term exceeds the maximum length of {} characters", MAX_TERM_LENGTH),
        ));
    }
    if DANGEROUS_TERM.is_match(term) {
        return Err(ApiError::validation(
            "Invalid term",
            "term contains forbidden content",
        ));
    }
    Ok(())
}

pub fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    if user_id.is_empty() {
        return Ok(());
    }
    if !USER_ID_PATTERN.is_match(user_id) {
        return Err(ApiError::validation(
            "Invalid user ID",
            "user id has an unrecognised format",
        ));
    }
    Ok(())
}

pub fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    if session_id.is_empty() {
        return Ok(());
    }
    if !SESSION_ID_PATTERN.is_match(session_id) {
        return Err(ApiError::validation(
            "Invalid session ID",
            "session id has an unrecognised format",
        ));
    }
    Ok(())
}
