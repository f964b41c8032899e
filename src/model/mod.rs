//! Core data types for `campus_fixit`.
//!
//! - `User` / `PublicUser` - accounts, with the hash kept out of any output
//! - `Role` and `Capability` - what each kind of account may do
//! - `Issue` - a reported facility problem
//! - `Status` / `Category` - the two fixed issue enums
//! - `Principal` - the identity attached to an authenticated request
//! - `Event` - audit entries written alongside issue mutations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FixitError;

/// Account role. Fixed at creation; there is no role-change path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// A single permission checked by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateIssue,
    ListOwnIssues,
    ViewIssue,
    ListAllIssues,
    UpdateStatus,
    UpdateRemarks,
}

impl Capability {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIssue => "create_issue",
            Self::ListOwnIssues => "list_own_issues",
            Self::ViewIssue => "view_issue",
            Self::ListAllIssues => "list_all_issues",
            Self::UpdateStatus => "update_status",
            Self::UpdateRemarks => "update_remarks",
        }
    }
}

impl Role {
    const STUDENT_CAPABILITIES: &'static [Capability] = &[
        Capability::CreateIssue,
        Capability::ListOwnIssues,
        Capability::ViewIssue,
    ];

    const ADMIN_CAPABILITIES: &'static [Capability] = &[
        Capability::CreateIssue,
        Capability::ListOwnIssues,
        Capability::ViewIssue,
        Capability::ListAllIssues,
        Capability::UpdateStatus,
        Capability::UpdateRemarks,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }

    /// Everything this role may do.
    #[must_use]
    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Student => Self::STUDENT_CAPABILITIES,
            Self::Admin => Self::ADMIN_CAPABILITIES,
        }
    }

    #[must_use]
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// True when every capability in `required` is granted.
    #[must_use]
    pub fn grants_all(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.grants(*c))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FixitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            other => Err(FixitError::validation(
                "role",
                format!("Unknown role '{other}'"),
            )),
        }
    }
}

/// Issue lifecycle status, in its server-side spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::Open, Self::InProgress, Self::Resolved];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }

    /// Whether an admin may move an issue from `self` to `to`.
    ///
    /// The workflow is deliberately unordered: any state may follow any
    /// other, including `Resolved -> Open` and same-state writes.
    #[must_use]
    pub const fn transition_allowed(&self, _to: Self) -> bool {
        true
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = FixitError;

    /// Exact server spelling only; the client maps its own forms first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| FixitError::validation("status", "Invalid status"))
    }
}

/// Facility category of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electrical,
    Water,
    Internet,
    Infrastructure,
}

impl Category {
    pub const ALL: [Self; 4] = [
        Self::Electrical,
        Self::Water,
        Self::Internet,
        Self::Infrastructure,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "Electrical",
            Self::Water => "Water",
            Self::Internet => "Internet",
            Self::Infrastructure => "Infrastructure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FixitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| FixitError::validation("category", "Invalid category"))
    }
}

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Always stored lowercased.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    #[must_use]
    pub fn to_principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The fields of a user any client may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Identity attached to a request once its token has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A reported facility problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    /// Storage path of the attached photo. Legacy rows may hold a full URL.
    pub image_url: Option<String>,
    pub created_by: String,
    /// Creator's public fields, filled by joined reads.
    pub creator: Option<PublicUser>,
    pub admin_remarks: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// Validated input for a new issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: Category,
}

/// Optional equality filters accepted by the list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilters {
    pub status: Option<Status>,
    pub category: Option<Category>,
}

/// Audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    StatusChanged,
    RemarksUpdated,
}

impl EventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::RemarksUpdated => "remarks_updated",
        }
    }
}

impl FromStr for EventType {
    type Err = FixitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "status_changed" => Ok(Self::StatusChanged),
            "remarks_updated" => Ok(Self::RemarksUpdated),
            other => Err(FixitError::Other(anyhow::anyhow!(
                "unknown event type '{other}'"
            ))),
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub issue_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str_and_parse() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert_eq!(Status::InProgress.to_string(), "In Progress");
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert!("open".parse::<Status>().is_err());
        assert!("in-progress".parse::<Status>().is_err());
        let err = "Closed".parse::<Status>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid status");
    }

    #[test]
    fn test_status_serde_uses_server_spelling() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: Status = serde_json::from_str("\"Resolved\"").unwrap();
        assert_eq!(parsed, Status::Resolved);
    }

    #[test]
    fn test_every_transition_is_allowed() {
        for from in Status::ALL {
            for to in Status::ALL {
                assert!(from.transition_allowed(to), "{from} -> {to}");
            }
        }
        assert!(Status::Resolved.transition_allowed(Status::Open));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Water".parse::<Category>().unwrap(), Category::Water);
        assert!("water".parse::<Category>().is_err());
        assert!("Plumbing".parse::<Category>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Student.grants(Capability::CreateIssue));
        assert!(Role::Student.grants(Capability::ViewIssue));
        assert!(!Role::Student.grants(Capability::ListAllIssues));
        assert!(!Role::Student.grants(Capability::UpdateStatus));
        assert!(!Role::Student.grants(Capability::UpdateRemarks));
        assert!(Role::Admin.grants_all(Role::Student.capabilities()));
        assert!(Role::Admin.grants_all(&[
            Capability::ListAllIssues,
            Capability::UpdateStatus,
            Capability::UpdateRemarks
        ]));
    }

    #[test]
    fn test_user_serialization_skips_hash() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Student,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"role\":\"student\""));
    }
}
