//! Error types and handling for `campus_fixit`.
//!
//! One error enum flows through the whole crate: storage, auth, the issue
//! lifecycle, the HTTP layer and the client. The HTTP layer renders it as the
//! `{message, errors?}` envelope, the CLI as structured JSON or human text.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for one-off failures
//! - Each variant maps to a stable [`ErrorCode`], an HTTP status and an exit code
//! - Messages of user-facing variants are safe to show to any caller

mod http;
mod structured;

pub use structured::{ErrorCode, StructuredError, detect_status_intent};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Why a bearer token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization: Bearer` header at all.
    MissingToken,
    /// Header present but empty after the scheme.
    MalformedToken,
    /// Token verified but its subject no longer exists.
    UnknownUser,
    /// Bad signature, expired, or undecodable.
    InvalidToken,
}

impl AuthFailure {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingToken => "Not authorized, token missing",
            Self::MalformedToken => "Invalid token format",
            Self::UnknownUser => "User not found",
            Self::InvalidToken => "Not authorized, token invalid or expired",
        }
    }
}

/// Primary error type for `campus_fixit` operations.
#[derive(Error, Debug)]
pub enum FixitError {
    // === Storage Errors ===
    /// Database file could not be opened.
    #[error("Cannot open database at '{path}': {reason}")]
    DatabaseUnavailable { path: PathBuf, reason: String },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Request Errors ===
    /// Input failed validation; `errors` lists the offending fields.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<ValidationError>,
    },

    /// Attempted to create something that already exists.
    #[error("{message}")]
    Conflict { message: String },

    /// Login failed. Deliberately says nothing about which part was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, malformed, expired or orphaned bearer token.
    #[error("{}", .0.message())]
    Unauthorized(AuthFailure),

    /// Authenticated but not allowed.
    #[error("{message}")]
    Forbidden { message: String },

    /// Issue with the specified ID was not found.
    #[error("Issue not found")]
    IssueNotFound { id: String },

    /// Any other missing resource (stored object, route).
    #[error("{message}")]
    NotFound { message: String },

    /// Per-client request budget exhausted.
    #[error("Too many requests, please try again later.")]
    RateLimited,

    // === Object Store Errors ===
    /// Upload or signing failed, or the store is not configured.
    #[error("Storage error: {0}")]
    Storage(String),

    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === Client Errors ===
    /// The server could not be reached at all.
    #[error("Cannot connect to server. Make sure the backend is running.")]
    Network { detail: String },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<ValidationError>,
    },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl FixitError {
    /// Can the caller fix this without a server-side change?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Conflict { .. }
                | Self::InvalidCredentials
                | Self::Unauthorized(_)
                | Self::IssueNotFound { .. }
                | Self::Config(_)
                | Self::Network { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized(_) => Some("Run: fixit login"),
            Self::Network { .. } => Some("Start the server with: fixit serve"),
            Self::Config(_) => Some("Check fixit.yaml and FIXIT_* environment variables"),
            Self::Conflict { .. } => Some("Log in with the existing account instead"),
            Self::RateLimited => Some("Wait a few minutes and retry"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::Validation {
            message: reason.clone(),
            errors: vec![ValidationError::new(field, reason)],
        }
    }

    /// Create from a batch of field errors under one summary message.
    #[must_use]
    pub fn from_validation_errors(message: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn storage(reason: impl std::fmt::Display) -> Self {
        Self::Storage(reason.to_string())
    }

    /// Field errors carried by this error, if any.
    #[must_use]
    pub fn field_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation { errors, .. } | Self::Api { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Result type using `FixitError`.
pub type Result<T> = std::result::Result<T, FixitError>;
