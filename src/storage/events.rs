//! Event storage operations for `campus_fixit`.
//!
//! Events are written by [`SqliteStorage::mutate`](super::SqliteStorage::mutate)
//! in the same transaction as the change they describe; this module reads
//! them back.
//!
//! The trail is write-only as far as the REST API and the CLI go: no route
//! or command returns it. Readers are the storage API itself and its tests.

use rusqlite::{Connection, params};

use crate::error::Result;
use crate::model::Event;
use crate::storage::sqlite::{parse_column, timestamp_column};

/// Get all events of one issue, oldest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_events(conn: &Connection, issue_id: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, issue_id, event_type, actor, old_value, new_value, created_at
        FROM events
        WHERE issue_id = ?1
        ORDER BY id ASC
        ",
    )?;

    let events = stmt
        .query_map(params![issue_id], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        event_type: parse_column(row, 2)?,
        actor: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;
    use crate::storage::schema::apply_schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute_batch(
            r"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES ('u1', 'A', 'a@x.io', 'h', 'admin', '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z');
            INSERT INTO issues (id, title, description, category, status, created_by, created_at, updated_at)
            VALUES ('i1', 'T', 'D', 'Water', 'Open', 'u1', '2025-01-01T00:00:00.000000Z', '2025-01-01T00:00:00.000000Z');
            INSERT INTO events (issue_id, event_type, actor, old_value, new_value, created_at)
            VALUES ('i1', 'created', 'u1', NULL, 'Open', '2025-01-01T00:00:00.000000Z');
            INSERT INTO events (issue_id, event_type, actor, old_value, new_value, created_at)
            VALUES ('i1', 'status_changed', 'u1', 'Open', 'Resolved', '2025-01-02T00:00:00.000000Z');
            ",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_get_events_oldest_first() {
        let conn = setup();
        let events = get_events(&conn, "i1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::Created);
        assert_eq!(events[1].event_type, EventType::StatusChanged);
        assert_eq!(events[1].new_value.as_deref(), Some("Resolved"));
    }

    #[test]
    fn test_get_events_unknown_issue_is_empty() {
        let conn = setup();
        assert!(get_events(&conn, "nope").unwrap().is_empty());
    }
}
