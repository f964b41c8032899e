//! Input validation for `campus_fixit`.
//!
//! Every validator runs before any side effect and reports all offending
//! fields at once, as a `Vec<ValidationError>` under one summary message.

use crate::error::{FixitError, Result, ValidationError};
use crate::model::{Category, NewIssue, Status};
use regex::Regex;
use std::sync::LazyLock;

/// Summary message for field-level failures.
pub const VALIDATION_FAILED: &str = "Validation failed";

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// True for `local@domain.tld` shaped addresses.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Canonical stored form of an email.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn finish<T>(errors: Vec<ValidationError>, value: T) -> Result<T> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(FixitError::from_validation_errors(VALIDATION_FAILED, errors))
    }
}

/// Validates registration input.
pub struct RegisterValidator;

impl RegisterValidator {
    /// Check name, email and password; returns the trimmed name and
    /// normalized email.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every failing field.
    pub fn validate(name: &str, email: &str, password: &str) -> Result<(String, String)> {
        let mut errors = Vec::new();

        let name = name.trim();
        if name.is_empty() {
            errors.push(ValidationError::new("name", "Name is required"));
        }
        if !is_valid_email(email) {
            errors.push(ValidationError::new("email", "Valid email is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(ValidationError::new(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        finish(errors, (name.to_string(), normalize_email(email)))
    }
}

/// Validates login input. Only presence is checked; anything else would
/// tell a caller more than "Invalid email or password" does.
pub struct LoginValidator;

impl LoginValidator {
    /// # Errors
    ///
    /// Returns "Email and password are required" with the missing fields.
    pub fn validate(email: &str, password: &str) -> Result<()> {
        let mut errors = Vec::new();
        if email.trim().is_empty() {
            errors.push(ValidationError::new("email", "Email is required"));
        }
        if password.is_empty() {
            errors.push(ValidationError::new("password", "Password is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FixitError::from_validation_errors(
                "Email and password are required",
                errors,
            ))
        }
    }
}

/// Validates issue fields.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate raw creation fields into a [`NewIssue`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if title or description is blank, or the
    /// category is not one of the fixed values.
    pub fn validate_new(
        title: Option<&str>,
        description: Option<&str>,
        category: Option<&str>,
    ) -> Result<NewIssue> {
        let mut errors = Vec::new();

        let title = title.map(str::trim).unwrap_or_default();
        if title.is_empty() {
            errors.push(ValidationError::new("title", "Title is required"));
        }

        let description = description.map(str::trim).unwrap_or_default();
        if description.is_empty() {
            errors.push(ValidationError::new("description", "Description is required"));
        }

        let category = category.and_then(|c| c.parse::<Category>().ok());
        if category.is_none() {
            errors.push(ValidationError::new("category", "Invalid category"));
        }

        match category {
            Some(category) if errors.is_empty() => Ok(NewIssue {
                title: title.to_string(),
                description: description.to_string(),
                category,
            }),
            _ => Err(FixitError::from_validation_errors(VALIDATION_FAILED, errors)),
        }
    }

    /// Validate a requested status.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless the value is exactly one of
    /// `Open`, `In Progress`, `Resolved`.
    pub fn validate_status(raw: Option<&str>) -> Result<Status> {
        raw.and_then(|s| s.parse::<Status>().ok()).ok_or_else(|| {
            FixitError::from_validation_errors(
                VALIDATION_FAILED,
                vec![ValidationError::new("status", "Invalid status")],
            )
        })
    }

    /// Remarks are optional: missing means empty, whitespace is trimmed.
    #[must_use]
    pub fn normalize_remarks(raw: Option<&str>) -> String {
        raw.map(str::trim).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_ok_normalizes() {
        let (name, email) =
            RegisterValidator::validate("  Alice ", " Alice@Example.com", "pw123456").unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(email, "alice@example.com");
    }

    #[test]
    fn test_register_reports_every_field() {
        let err = RegisterValidator::validate(" ", "not-an-email", "123").unwrap_err();
        assert_eq!(err.to_string(), VALIDATION_FAILED);
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["name", "email", "password"]);
    }

    #[test]
    fn test_password_length_boundary() {
        assert!(RegisterValidator::validate("A", "a@b.co", "12345").is_err());
        assert!(RegisterValidator::validate("A", "a@b.co", "123456").is_ok());
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("student@campus.edu"));
        assert!(!is_valid_email("student@campus"));
        assert!(!is_valid_email("student campus@x.edu"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_login_requires_both() {
        let err = LoginValidator::validate("", "").unwrap_err();
        assert_eq!(err.to_string(), "Email and password are required");
        assert_eq!(err.field_errors().len(), 2);

        let err = LoginValidator::validate("a@b.co", "").unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "password");

        assert!(LoginValidator::validate("a@b.co", "x").is_ok());
    }

    #[test]
    fn test_new_issue_validation() {
        let issue =
            IssueValidator::validate_new(Some(" Leaky faucet "), Some("Drips"), Some("Water"))
                .unwrap();
        assert_eq!(issue.title, "Leaky faucet");
        assert_eq!(issue.category, Category::Water);

        let err = IssueValidator::validate_new(Some(""), None, Some("Plumbing")).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["title", "description", "category"]);
    }

    #[test]
    fn test_status_validation() {
        assert_eq!(
            IssueValidator::validate_status(Some("In Progress")).unwrap(),
            Status::InProgress
        );
        let err = IssueValidator::validate_status(Some("Closed")).unwrap_err();
        assert_eq!(err.field_errors()[0].message, "Invalid status");
        assert!(IssueValidator::validate_status(None).is_err());
    }

    #[test]
    fn test_remarks_are_optional_and_trimmed() {
        assert_eq!(IssueValidator::normalize_remarks(None), "");
        assert_eq!(IssueValidator::normalize_remarks(Some("  ok  ")), "ok");
    }
}
