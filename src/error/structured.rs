//! Structured error output.
//!
//! Every [`FixitError`] collapses to a [`StructuredError`] carrying:
//! - a stable machine-readable code
//! - the message a caller may see
//! - field-level validation errors, when there are any
//! - a hint for self-correction and a retryability flag
//!
//! The same value renders the HTTP envelope `{message, errors?}` and the CLI
//! output (`{"error": {...}}` under `--json`, `Error: ...` otherwise).

use crate::error::{FixitError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Message shown for any 5xx that is not a storage failure.
pub const GENERIC_SERVER_MESSAGE: &str = "Server error";
/// Message shown when the object store fails.
pub const GENERIC_STORAGE_MESSAGE: &str = "File storage error";

/// Machine-readable error codes.
///
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Request (exit code 4) ===
    ValidationFailed,
    Conflict,
    // === Auth (exit code 5) ===
    AuthRequired,
    InvalidCredentials,
    Forbidden,
    // === Lookup (exit code 3) ===
    NotFound,
    // === Throttling (exit code 4) ===
    RateLimited,
    // === Object store (exit code 6) ===
    StorageError,
    // === Database (exit code 2) ===
    DatabaseError,
    // === Config (exit code 7) ===
    ConfigError,
    // === Transport (exit code 8) ===
    NetworkError,
    // === Internal (exit code 1) ===
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Conflict => "CONFLICT",
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::StorageError => "STORAGE_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status used when this code crosses the REST boundary.
    ///
    /// Bad credentials and duplicate emails are 400, not 401/409, so a client
    /// never mistakes a typo for an expired session.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::ValidationFailed | Self::Conflict | Self::InvalidCredentials => 400,
            Self::AuthRequired => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::RateLimited => 429,
            Self::NetworkError => 503,
            Self::StorageError | Self::DatabaseError | Self::ConfigError | Self::InternalError => {
                500
            }
        }
    }

    /// Classify a status code reported by the server.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::AuthRequired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            400..=499 => Self::ValidationFailed,
            _ => Self::InternalError,
        }
    }

    /// Whether retrying might succeed (after a wait or with fixed input).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed | Self::RateLimited | Self::NetworkError | Self::AuthRequired
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: internal
    /// - 2: database
    /// - 3: not found
    /// - 4: bad request
    /// - 5: authentication / authorization
    /// - 6: object store
    /// - 7: config
    /// - 8: transport
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::NotFound => 3,
            Self::ValidationFailed | Self::Conflict | Self::RateLimited => 4,
            Self::AuthRequired | Self::InvalidCredentials | Self::Forbidden => 5,
            Self::StorageError => 6,
            Self::ConfigError => 7,
            Self::NetworkError => 8,
        }
    }

    /// True for failures whose details must stay server-side.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::StorageError | Self::DatabaseError | Self::ConfigError | Self::InternalError
        )
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Field-level validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
}

impl StructuredError {
    /// Create a structured error with full detail, for local (CLI) output.
    #[must_use]
    pub fn from_error(err: &FixitError) -> Self {
        let code = code_for(err);
        Self {
            code,
            message: err.to_string(),
            errors: err.field_errors().to_vec(),
            hint: generate_hint(err),
            retryable: code.is_retryable(),
        }
    }

    /// Create a structured error safe to send to a remote caller.
    ///
    /// Internal failures lose their message; everything else keeps it.
    #[must_use]
    pub fn public(err: &FixitError) -> Self {
        let mut structured = Self::from_error(err);
        if structured.code.is_internal() {
            structured.message = if structured.code == ErrorCode::StorageError {
                GENERIC_STORAGE_MESSAGE.to_string()
            } else {
                GENERIC_SERVER_MESSAGE.to_string()
            };
            structured.hint = None;
        }
        structured
    }

    /// The `{message, errors?}` body the REST API returns.
    #[must_use]
    pub fn to_http_body(&self) -> Value {
        if self.errors.is_empty() {
            json!({ "message": self.message })
        } else {
            json!({ "message": self.message, "errors": self.errors })
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "errors": self.errors,
                "hint": self.hint,
                "retryable": self.retryable,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }
        output.push_str(&self.message);

        for field_error in &self.errors {
            output.push_str("\n  - ");
            output.push_str(&field_error.to_string());
        }

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }
}

fn code_for(err: &FixitError) -> ErrorCode {
    match err {
        FixitError::Validation { .. } => ErrorCode::ValidationFailed,
        FixitError::Conflict { .. } => ErrorCode::Conflict,
        FixitError::InvalidCredentials => ErrorCode::InvalidCredentials,
        FixitError::Unauthorized(_) => ErrorCode::AuthRequired,
        FixitError::Forbidden { .. } => ErrorCode::Forbidden,
        FixitError::IssueNotFound { .. } | FixitError::NotFound { .. } => ErrorCode::NotFound,
        FixitError::RateLimited => ErrorCode::RateLimited,
        FixitError::Storage(_) => ErrorCode::StorageError,
        FixitError::DatabaseUnavailable { .. } | FixitError::Database(_) => {
            ErrorCode::DatabaseError
        }
        FixitError::Config(_) | FixitError::Yaml(_) => ErrorCode::ConfigError,
        FixitError::Network { .. } => ErrorCode::NetworkError,
        FixitError::Api { status, .. } => ErrorCode::from_http_status(*status),
        FixitError::Io(_) | FixitError::Json(_) | FixitError::Other(_) => {
            ErrorCode::InternalError
        }
    }
}

fn generate_hint(err: &FixitError) -> Option<String> {
    if let Some(suggestion) = err.suggestion() {
        return Some(suggestion.to_string());
    }

    match err {
        FixitError::IssueNotFound { .. } => {
            Some("Run 'fixit issues mine' to see your issues.".to_string())
        }
        FixitError::Validation { errors, .. } => {
            errors.iter().find_map(|e| match e.field.as_str() {
                "status" => Some("Valid statuses: Open, In Progress, Resolved".to_string()),
                "category" => Some(format!("Valid categories: {}", VALID_CATEGORIES.join(", "))),
                _ => None,
            })
        }
        FixitError::Api {
            status: 401, ..
        } => Some("Run: fixit login".to_string()),
        _ => None,
    }
}

const VALID_CATEGORIES: [&str; 4] = ["Electrical", "Water", "Internet", "Infrastructure"];

/// Status synonyms for intent detection, mapped to the client form.
static STATUS_SYNONYMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("new", "open"),
        ("todo", "open"),
        ("reopen", "open"),
        ("pending", "open"),
        ("wip", "in-progress"),
        ("working", "in-progress"),
        ("started", "in-progress"),
        ("progress", "in-progress"),
        ("in_progress", "in-progress"),
        ("inprogress", "in-progress"),
        ("done", "resolved"),
        ("fixed", "resolved"),
        ("closed", "resolved"),
        ("complete", "resolved"),
        ("completed", "resolved"),
    ]
    .into_iter()
    .collect()
});

/// Detect which status a user likely meant by an unrecognized value.
#[must_use]
pub fn detect_status_intent(input: &str) -> Option<&'static str> {
    let lower = input.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if let Some(&canonical) = STATUS_SYNONYMS.get(lower.as_str()) {
        return Some(canonical);
    }

    ["open", "in-progress", "resolved"]
        .into_iter()
        .find(|status| status.starts_with(&lower))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthFailure;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValidationFailed.as_str(), "VALIDATION_FAILED");
        assert_eq!(ErrorCode::AuthRequired.as_str(), "AUTH_REQUIRED");
        assert_eq!(ErrorCode::StorageError.as_str(), "STORAGE_ERROR");
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidCredentials.http_status(), 400);
        assert_eq!(ErrorCode::Conflict.http_status(), 400);
        assert_eq!(ErrorCode::AuthRequired.http_status(), 401);
        assert_eq!(ErrorCode::Forbidden.http_status(), 403);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::RateLimited.http_status(), 429);
        assert_eq!(ErrorCode::StorageError.http_status(), 500);
    }

    #[test]
    fn test_error_code_exit_codes() {
        assert_eq!(ErrorCode::InternalError.exit_code(), 1);
        assert_eq!(ErrorCode::DatabaseError.exit_code(), 2);
        assert_eq!(ErrorCode::NotFound.exit_code(), 3);
        assert_eq!(ErrorCode::ValidationFailed.exit_code(), 4);
        assert_eq!(ErrorCode::Forbidden.exit_code(), 5);
        assert_eq!(ErrorCode::NetworkError.exit_code(), 8);
    }

    #[test]
    fn test_public_error_hides_internals() {
        let err = FixitError::storage("bucket campus-fixit-uploads: 403 from upstream");
        let public = StructuredError::public(&err);
        assert_eq!(public.code, ErrorCode::StorageError);
        assert_eq!(public.message, GENERIC_STORAGE_MESSAGE);

        let err = FixitError::Other(anyhow::anyhow!("disk exploded at /var/db"));
        let public = StructuredError::public(&err);
        assert_eq!(public.message, GENERIC_SERVER_MESSAGE);
        assert!(!public.to_http_body().to_string().contains("/var/db"));
    }

    #[test]
    fn test_http_body_shape() {
        let err = FixitError::from_validation_errors(
            "Validation failed",
            vec![ValidationError::new("email", "Valid email is required")],
        );
        let body = StructuredError::public(&err).to_http_body();
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "email");

        let body =
            StructuredError::public(&FixitError::Unauthorized(AuthFailure::MissingToken))
                .to_http_body();
        assert_eq!(body, json!({"message": "Not authorized, token missing"}));
    }

    #[test]
    fn test_api_error_classified_by_status() {
        let err = FixitError::Api {
            status: 403,
            message: "Access denied".to_string(),
            errors: Vec::new(),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::Forbidden);
        assert_eq!(structured.message, "Access denied");
    }

    #[test]
    fn test_detect_status_intent() {
        assert_eq!(detect_status_intent("done"), Some("resolved"));
        assert_eq!(detect_status_intent("WIP"), Some("in-progress"));
        assert_eq!(detect_status_intent("in"), Some("in-progress"));
        assert_eq!(detect_status_intent("xyz"), None);
        assert_eq!(detect_status_intent(""), None);
    }

    #[test]
    fn test_to_human_output() {
        let err = FixitError::from_validation_errors(
            "Validation failed",
            vec![ValidationError::new("name", "Name is required")],
        );
        let human = StructuredError::from_error(&err).to_human(false);
        assert!(human.starts_with("Error: Validation failed"));
        assert!(human.contains("  - name: Name is required"));
    }
}
