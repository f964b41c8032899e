//! `SQLite` storage implementation.

use crate::error::{FixitError, Result};
use crate::model::{
    Category, Event, EventType, Issue, IssueFilters, PublicUser, Role, Status, User,
};
use crate::storage::schema::apply_schema;
use crate::util::time::{format_timestamp, parse_timestamp};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Columns selected for every issue read; the creator is joined in.
const ISSUE_COLUMNS: &str = r"
    i.id, i.title, i.description, i.category, i.status, i.image_url, i.created_by,
    i.admin_remarks, i.created_at, i.updated_at,
    u.id, u.name, u.email, u.role
";

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
pub struct MutationContext {
    pub op_name: String,
    pub actor: String,
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record a field change event with old and new values.
    pub fn record_field_change(
        &mut self,
        event_type: EventType,
        issue_id: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(Event {
            id: 0, // Placeholder, DB assigns
            issue_id: issue_id.to_string(),
            event_type,
            actor: self.actor.clone(),
            old_value,
            new_value,
            created_at: Utc::now(),
        });
    }
}

/// Filters for [`SqliteStorage::list_issues`]. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub created_by: Option<String>,
    pub limit: Option<usize>,
}

impl ListFilters {
    /// The request filters, optionally narrowed to one creator.
    #[must_use]
    pub fn from_request(filters: IssueFilters, created_by: Option<&str>) -> Self {
        Self {
            status: filters.status,
            category: filters.category,
            created_by: created_by.map(ToString::to_string),
            limit: None,
        }
    }
}

/// Where a `database.url` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite://path` or a bare path.
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if rest == ":memory:" || rest.is_empty() {
            Self::Memory
        } else {
            Self::File(PathBuf::from(rest))
        }
    }
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FixitError::DatabaseUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        let conn = Connection::open(path).map_err(|e| FixitError::DatabaseUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open whatever a `database.url` names.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open_url(url: &str) -> Result<Self> {
        match DatabaseLocation::parse(url) {
            DatabaseLocation::Memory => Self::open_memory(),
            DatabaseLocation::File(path) => Self::open_with_timeout(&path, Some(5_000)),
        }
    }

    /// Cheap connectivity probe against the users table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT COUNT(*) FROM users LIMIT 1", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(())
    }

    /// Execute a mutation inside an immediate transaction.
    ///
    /// Events recorded on the context are written in the same transaction,
    /// so either both land or neither does.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            tx.execute(
                "INSERT INTO events (issue_id, event_type, actor, old_value, new_value, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    event.issue_id,
                    event.event_type.as_str(),
                    event.actor,
                    event.old_value,
                    event.new_value,
                    format_timestamp(&event.created_at),
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(op = %ctx.op_name, actor = %ctx.actor, events = ctx.events.len(), "mutation committed");

        Ok(result)
    }

    // ========================================================================
    // USERS
    // ========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns [`FixitError::Conflict`] if the email (case-insensitively) is taken.
    pub fn create_user(&mut self, user: &User) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                user.id,
                user.name,
                user.email.trim().to_lowercase(),
                user.password_hash,
                user.role.as_str(),
                format_timestamp(&user.created_at),
                format_timestamp(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(FixitError::Conflict {
                    message: "Email already registered".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look a user up by email, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
        let user = self
            .conn
            .query_row(&sql, [email.trim()], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = self.conn.query_row(&sql, [id], user_from_row).optional()?;
        Ok(user)
    }

    /// Count users, optionally of one role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_users(&self, role: Option<Role>) -> Result<usize> {
        let count: i64 = match role {
            Some(role) => self.conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?",
                [role.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?,
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ========================================================================
    // ISSUES
    // ========================================================================

    /// Create a new issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be inserted (e.g. unknown creator).
    pub fn create_issue(&mut self, issue: &Issue, actor: &str) -> Result<()> {
        self.mutate("create_issue", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO issues (
                    id, title, description, category, status, image_url, created_by,
                    admin_remarks, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    issue.id,
                    issue.title,
                    issue.description,
                    issue.category.as_str(),
                    issue.status.as_str(),
                    issue.image_url,
                    issue.created_by,
                    issue.admin_remarks,
                    format_timestamp(&issue.created_at),
                    format_timestamp(&issue.updated_at),
                ],
            )?;

            ctx.record_field_change(
                EventType::Created,
                &issue.id,
                None,
                Some(issue.status.as_str().to_string()),
            );

            Ok(())
        })
    }

    /// Get an issue by ID, with its creator joined in.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i LEFT JOIN users u ON u.id = i.created_by
             WHERE i.id = ?"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let result = stmt.query_row([id], issue_from_row);

        match result {
            Ok(issue) => Ok(Some(issue)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List issues matching every set filter, newest created first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_issues(&self, filters: &ListFilters) -> Result<Vec<Issue>> {
        let mut sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i LEFT JOIN users u ON u.id = i.created_by
             WHERE 1=1"
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filters.status {
            sql.push_str(" AND i.status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(category) = filters.category {
            sql.push_str(" AND i.category = ?");
            params.push(Box::new(category.as_str()));
        }

        if let Some(ref created_by) = filters.created_by {
            sql.push_str(" AND i.created_by = ?");
            params.push(Box::new(created_by.clone()));
        }

        // rowid breaks ties between issues created in the same microsecond.
        sql.push_str(" ORDER BY i.created_at DESC, i.rowid DESC");

        if let Some(limit) = filters.limit.filter(|l| *l > 0) {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
        let issues = stmt
            .query_map(params_refs.as_slice(), issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(issues)
    }

    /// Set an issue's status.
    ///
    /// Writing the current value again is a no-op: nothing changes and no
    /// event is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`FixitError::IssueNotFound`] if the issue doesn't exist.
    pub fn update_status(&mut self, id: &str, status: Status, actor: &str) -> Result<Issue> {
        self.mutate("update_status", actor, |tx, ctx| {
            let current: String = current_field(tx, id, "status")?;
            let from: Status = current.parse()?;
            if !from.transition_allowed(status) {
                return Err(FixitError::validation(
                    "status",
                    format!("Cannot move from {from} to {status}"),
                ));
            }
            if from != status {
                tx.execute(
                    "UPDATE issues SET status = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![status.as_str(), format_timestamp(&Utc::now()), id],
                )?;
                ctx.record_field_change(
                    EventType::StatusChanged,
                    id,
                    Some(current),
                    Some(status.as_str().to_string()),
                );
            }
            Ok(())
        })?;

        self.get_issue(id)?.ok_or_else(|| FixitError::IssueNotFound { id: id.to_string() })
    }

    /// Replace an issue's admin remarks. Same no-op rule as [`Self::update_status`].
    ///
    /// # Errors
    ///
    /// Returns [`FixitError::IssueNotFound`] if the issue doesn't exist.
    pub fn update_remarks(&mut self, id: &str, remarks: &str, actor: &str) -> Result<Issue> {
        self.mutate("update_remarks", actor, |tx, ctx| {
            let current: String = current_field(tx, id, "admin_remarks")?;
            if current != remarks {
                tx.execute(
                    "UPDATE issues SET admin_remarks = ?, updated_at = ? WHERE id = ?",
                    rusqlite::params![remarks, format_timestamp(&Utc::now()), id],
                )?;
                ctx.record_field_change(
                    EventType::RemarksUpdated,
                    id,
                    Some(current),
                    Some(remarks.to_string()),
                );
            }
            Ok(())
        })?;

        self.get_issue(id)?.ok_or_else(|| FixitError::IssueNotFound { id: id.to_string() })
    }

    /// Count all issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_issues(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Audit trail of one issue, oldest first.
    ///
    /// Not served over HTTP; see [`crate::storage::events`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_events(&self, issue_id: &str) -> Result<Vec<Event>> {
        crate::storage::events::get_events(&self.conn, issue_id)
    }
}

/// Read one column of an existing issue inside a transaction.
fn current_field(tx: &Transaction, id: &str, column: &str) -> Result<String> {
    let sql = format!("SELECT {column} FROM issues WHERE id = ?");
    tx.query_row(&sql, [id], |row| row.get::<_, String>(0))
        .optional()?
        .ok_or_else(|| FixitError::IssueNotFound { id: id.to_string() })
}

pub(crate) fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

pub(crate) fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp_column(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<chrono::DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: parse_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

fn issue_from_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    let creator = match row.get::<_, Option<String>>(10)? {
        Some(id) => Some(PublicUser {
            id,
            name: row.get(11)?,
            email: row.get(12)?,
            role: parse_column(row, 13)?,
        }),
        None => None,
    };

    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: parse_column(row, 3)?,
        status: parse_column(row, 4)?,
        image_url: row.get(5)?,
        created_by: row.get(6)?,
        creator,
        admin_remarks: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}
