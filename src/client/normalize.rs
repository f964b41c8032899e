//! The one mapping between API payloads and client-side shapes.
//!
//! Servers have answered with both `created_at` and `createdAt`, `image_url`
//! and `imageUrl`, `id` and `_id`, a populated `createdBy` object or a bare
//! id. Everything is folded into [`ClientIssue`] here and nowhere else.
//! Statuses cross the boundary through [`ClientStatus`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{FixitError, detect_status_intent};
use crate::model::Status;
use crate::util::time::format_timestamp;

/// Display form of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl ClientStatus {
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Resolved];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
        }
    }

    /// Accepts either form in any casing; anything unknown reads as open.
    #[must_use]
    pub fn lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "in-progress" | "in progress" | "in_progress" => Self::InProgress,
            "resolved" => Self::Resolved,
            _ => Self::Open,
        }
    }

    #[must_use]
    pub const fn to_server(self) -> Status {
        match self {
            Self::Open => Status::Open,
            Self::InProgress => Status::InProgress,
            Self::Resolved => Status::Resolved,
        }
    }

    #[must_use]
    pub const fn from_server(status: Status) -> Self {
        match status {
            Status::Open => Self::Open,
            Status::InProgress => Self::InProgress,
            Status::Resolved => Self::Resolved,
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = FixitError;

    /// Strict parse for user input: either form, any casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in-progress" | "in progress" | "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            _ => {
                let message = detect_status_intent(s).map_or_else(
                    || format!("Invalid status '{s}' (expected open, in-progress or resolved)"),
                    |meant| format!("Invalid status '{s}' (did you mean '{meant}'?)"),
                );
                Err(FixitError::validation("status", message))
            }
        }
    }
}

/// Creator fields as the client keeps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Canonical client-side issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIssue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: ClientStatus,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<ClientUser>,
    pub image_url: Option<String>,
    pub admin_remarks: String,
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn normalize_user(value: Option<&Value>) -> Option<ClientUser> {
    let value = value?;
    // A bare id carries nothing to show.
    let name = value.get("name").and_then(Value::as_str)?;
    Some(ClientUser {
        id: first_str(value, &["id", "_id"]).unwrap_or_default().to_string(),
        name: name.to_string(),
        email: first_str(value, &["email"]).unwrap_or_default().to_string(),
    })
}

/// Fold any server issue payload into a [`ClientIssue`].
#[must_use]
pub fn normalize_issue(value: &Value) -> ClientIssue {
    let now = format_timestamp(&Utc::now());
    let text = |keys: &[&str]| first_str(value, keys).unwrap_or_default().to_string();

    ClientIssue {
        id: text(&["id", "_id"]),
        title: text(&["title"]),
        description: text(&["description"]),
        category: text(&["category"]),
        status: ClientStatus::lenient(first_str(value, &["status"]).unwrap_or_default()),
        created_at: first_str(value, &["created_at", "createdAt"])
            .map_or_else(|| now.clone(), ToString::to_string),
        updated_at: first_str(value, &["updated_at", "updatedAt"])
            .map_or_else(|| now.clone(), ToString::to_string),
        created_by: normalize_user(value.get("createdBy")),
        image_url: first_str(value, &["imageUrl", "image_url"]).map(ToString::to_string),
        admin_remarks: text(&["adminRemarks", "admin_remarks"]),
    }
}

/// Normalize a list payload; anything but an array is an empty list.
#[must_use]
pub fn normalize_issues(value: &Value) -> Vec<ClientIssue> {
    value
        .as_array()
        .map(|items| items.iter().map(normalize_issue).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trip() {
        for status in Status::ALL {
            assert_eq!(ClientStatus::from_server(status).to_server(), status);
        }
        assert_eq!(ClientStatus::InProgress.to_server().as_str(), "In Progress");
    }

    #[test]
    fn test_lenient_status() {
        assert_eq!(ClientStatus::lenient("In Progress"), ClientStatus::InProgress);
        assert_eq!(ClientStatus::lenient("in-progress"), ClientStatus::InProgress);
        assert_eq!(ClientStatus::lenient("RESOLVED"), ClientStatus::Resolved);
        assert_eq!(ClientStatus::lenient("weird"), ClientStatus::Open);
        assert_eq!(ClientStatus::lenient(""), ClientStatus::Open);
    }

    #[test]
    fn test_strict_status_parse() {
        assert_eq!("Resolved".parse::<ClientStatus>().unwrap(), ClientStatus::Resolved);
        let err = "closed".parse::<ClientStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid status 'closed' (did you mean 'resolved'?)");
        assert!("xyz".parse::<ClientStatus>().is_err());
    }

    #[test]
    fn test_normalize_server_shape() {
        let issue = normalize_issue(&json!({
            "id": "i1",
            "title": "Leaky faucet",
            "description": "Drips",
            "category": "Water",
            "status": "In Progress",
            "imageUrl": "https://x/signed",
            "createdBy": {"id": "u1", "name": "Alice", "email": "a@x.io", "role": "student"},
            "adminRemarks": "On it",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T00:00:00Z"
        }));
        assert_eq!(issue.id, "i1");
        assert_eq!(issue.status, ClientStatus::InProgress);
        assert_eq!(issue.image_url.as_deref(), Some("https://x/signed"));
        assert_eq!(issue.created_by.unwrap().name, "Alice");
        assert_eq!(issue.admin_remarks, "On it");
        assert_eq!(issue.created_at, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn test_normalize_alternate_spellings() {
        let issue = normalize_issue(&json!({
            "_id": "i2",
            "status": "resolved",
            "image_url": "path.png",
            "admin_remarks": "done",
            "createdAt": "2025-03-01T00:00:00Z",
            "updatedAt": "2025-03-02T00:00:00Z",
            "createdBy": "u9"
        }));
        assert_eq!(issue.id, "i2");
        assert_eq!(issue.status, ClientStatus::Resolved);
        assert_eq!(issue.image_url.as_deref(), Some("path.png"));
        assert_eq!(issue.admin_remarks, "done");
        assert_eq!(issue.updated_at, "2025-03-02T00:00:00Z");
        assert!(issue.created_by.is_none());
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let issue = normalize_issue(&json!({}));
        assert_eq!(issue.id, "");
        assert_eq!(issue.status, ClientStatus::Open);
        assert!(!issue.created_at.is_empty());
        assert!(issue.image_url.is_none());
        assert!(normalize_issues(&json!({"not": "a list"})).is_empty());
    }

    #[test]
    fn test_client_issue_serializes_camel_case() {
        let value = serde_json::to_value(normalize_issue(&json!({"status": "In Progress"}))).unwrap();
        assert_eq!(value["status"], "in-progress");
        assert!(value.get("adminRemarks").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
