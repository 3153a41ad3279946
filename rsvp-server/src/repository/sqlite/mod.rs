//! SQLite implementation of `RsvpRepository`.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.
//!
//! Timestamps are stored as INTEGER unix milliseconds. Guest responses and
//! event custom fields are stored as JSON text.

mod rows;


use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::warn;

use super::{RepositoryError, RsvpRepository};
use rows::{EventRow, GuestRow, OrganizerRow, EVENT_COLUMNS, GUEST_COLUMNS};
use rsvp_core::{
    Event, EventDraft, EventId, Guest, GuestDetails, GuestId, GuestStatus, NewGuest,
    NewOrganizer, Organizer, OrganizerId, Responses,
};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed RSVP repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
pub struct SqliteRepository {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// # Durability
    ///
    /// The database is configured with:
    /// - `journal_mode = WAL` for better concurrency and crash safety
    /// - `synchronous = FULL` so acknowledged RSVPs survive power loss
    /// - `busy_timeout = 5000ms` to handle concurrent access gracefully
    /// - `foreign_keys = ON` so deleting an event deletes its guests
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // Guest emails and phone numbers live here.
        #[cfg(unix)]
        if !is_in_memory && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!(
                    "Failed to set restrictive permissions on database file: {}",
                    e
                );
            }
        }

        // SQLite can silently keep DELETE mode on filesystems without shared
        // memory support. In-memory databases report "memory".
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));

        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "Failed to enable WAL mode: SQLite returned '{}' instead of 'wal'. \
                     This can happen on filesystems that don't support shared memory \
                     (e.g., some network filesystems).",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        // 0 means a fresh database
        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS organizers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    api_token_hash TEXT NOT NULL UNIQUE,
                    created_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    organizer_id INTEGER NOT NULL
                        REFERENCES organizers(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT,
                    date INTEGER NOT NULL,
                    location TEXT,
                    custom_fields TEXT NOT NULL DEFAULT '{}',
                    created_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_events_organizer
                    ON events(organizer_id, date);
                CREATE INDEX IF NOT EXISTS idx_events_date
                    ON events(date);

                CREATE TABLE IF NOT EXISTS guests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    event_id INTEGER NOT NULL
                        REFERENCES events(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    phone TEXT,
                    status TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'confirmed', 'declined')),
                    plus_one_count INTEGER NOT NULL DEFAULT 0
                        CHECK (plus_one_count >= 0),
                    responses TEXT NOT NULL DEFAULT '{}',
                    access_token TEXT NOT NULL UNIQUE,
                    last_reminder_sent INTEGER,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_guests_event
                    ON guests(event_id, id);
                CREATE INDEX IF NOT EXISTS idx_guests_pending
                    ON guests(event_id) WHERE status = 'pending';
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite repository (for testing).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| RepositoryError::storage(operation, "connection lock poisoned"))?;
            f(&conn)
        })
        .await
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?
    }
}

// =============================================================================
// Conversion helpers
// =============================================================================

pub(super) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(super) fn from_millis(
    millis: i64,
    what: &'static str,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp_millis(millis).ok_or(RepositoryError::Corruption(what))
}

/// If `e` is a UNIQUE constraint failure, the message naming the column.
fn unique_violation(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(message))
            if err.code == ErrorCode::ConstraintViolation
                && message.starts_with("UNIQUE constraint failed") =>
        {
            Some(message.as_str())
        }
        _ => None,
    }
}

fn storage(operation: &'static str) -> impl Fn(rusqlite::Error) -> RepositoryError {
    move |e| RepositoryError::storage(operation, e.to_string())
}

// =============================================================================
// RsvpRepository trait implementation
// =============================================================================

#[async_trait]
impl RsvpRepository for SqliteRepository {
    async fn insert_organizer(
        &self,
        organizer: NewOrganizer,
        api_token_hash: String,
        created_at: DateTime<Utc>,
    ) -> Result<Organizer, RepositoryError> {
        self.with_conn("insert_organizer", move |conn| {
            let inserted = conn.execute(
                "INSERT INTO organizers (name, email, api_token_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    organizer.name,
                    organizer.email,
                    api_token_hash,
                    to_millis(created_at)
                ],
            );
            if let Err(e) = inserted {
                return Err(match unique_violation(&e) {
                    Some(message) if message.contains("email") => {
                        RepositoryError::Duplicate("organizer email")
                    }
                    Some(_) => RepositoryError::Duplicate("organizer api token"),
                    None => RepositoryError::storage("insert_organizer", e.to_string()),
                });
            }

            Ok(Organizer {
                id: OrganizerId(conn.last_insert_rowid()),
                name: organizer.name,
                email: organizer.email,
                created_at,
            })
        })
        .await
    }

    async fn find_organizer_by_token_hash(
        &self,
        api_token_hash: &str,
    ) -> Result<Option<Organizer>, RepositoryError> {
        let api_token_hash = api_token_hash.to_string();
        self.with_conn("find_organizer_by_token_hash", move |conn| {
            conn.query_row(
                "SELECT id, name, email, created_at FROM organizers
                 WHERE api_token_hash = ?1",
                params![api_token_hash],
                OrganizerRow::read,
            )
            .optional()
            .map_err(storage("find_organizer_by_token_hash"))?
            .map(OrganizerRow::into_organizer)
            .transpose()
        })
        .await
    }

    async fn insert_event(
        &self,
        organizer_id: OrganizerId,
        draft: EventDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Event, RepositoryError> {
        let custom_fields = rows::encode_json(&draft.custom_fields, "insert_event")?;
        self.with_conn("insert_event", move |conn| {
            conn.execute(
                "INSERT INTO events (organizer_id, title, description, date, location,
                                     custom_fields, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    organizer_id.0,
                    draft.title,
                    draft.description,
                    to_millis(draft.date),
                    draft.location,
                    custom_fields,
                    to_millis(created_at)
                ],
            )
            .map_err(storage("insert_event"))?;

            let id = EventId(conn.last_insert_rowid());
            Ok(draft.into_event(id, organizer_id, created_at))
        })
        .await
    }

    async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Option<Event>, RepositoryError> {
        let custom_fields = rows::encode_json(&draft.custom_fields, "update_event")?;
        self.with_conn("update_event", move |conn| {
            conn.query_row(
                &format!(
                    "UPDATE events
                     SET title = ?2, description = ?3, date = ?4, location = ?5,
                         custom_fields = ?6
                     WHERE id = ?1
                     RETURNING {}",
                    EVENT_COLUMNS
                ),
                params![
                    id.0,
                    draft.title,
                    draft.description,
                    to_millis(draft.date),
                    draft.location,
                    custom_fields
                ],
                EventRow::read,
            )
            .optional()
            .map_err(storage("update_event"))?
            .map(EventRow::into_event)
            .transpose()
        })
        .await
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        self.with_conn("get_event", move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
                params![id.0],
                EventRow::read,
            )
            .optional()
            .map_err(storage("get_event"))?
            .map(EventRow::into_event)
            .transpose()
        })
        .await
    }

    async fn list_events_by_organizer(
        &self,
        organizer_id: OrganizerId,
    ) -> Result<Vec<Event>, RepositoryError> {
        self.with_conn("list_events_by_organizer", move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM events WHERE organizer_id = ?1 ORDER BY date, id",
                    EVENT_COLUMNS
                ))
                .map_err(storage("list_events_by_organizer"))?;
            let rows = stmt
                .query_map(params![organizer_id.0], EventRow::read)
                .map_err(storage("list_events_by_organizer"))?;
            rows::collect_events(rows, "list_events_by_organizer")
        })
        .await
    }

    async fn list_events_between(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepositoryError> {
        self.with_conn("list_events_between", move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM events WHERE date > ?1 AND date <= ?2 ORDER BY date, id",
                    EVENT_COLUMNS
                ))
                .map_err(storage("list_events_between"))?;
            let rows = stmt
                .query_map(params![to_millis(after), to_millis(until)], EventRow::read)
                .map_err(storage("list_events_between"))?;
            rows::collect_events(rows, "list_events_between")
        })
        .await
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, RepositoryError> {
        self.with_conn("delete_event", move |conn| {
            let deleted = conn
                .execute("DELETE FROM events WHERE id = ?1", params![id.0])
                .map_err(storage("delete_event"))?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn insert_guest(&self, guest: NewGuest) -> Result<Guest, RepositoryError> {
        self.with_conn("insert_guest", move |conn| {
            let inserted = conn.execute(
                "INSERT INTO guests (event_id, name, email, phone, status, plus_one_count,
                                     responses, access_token, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', 0, '{}', ?5, ?6, ?6)",
                params![
                    guest.event_id.0,
                    guest.details.name,
                    guest.details.email,
                    guest.details.phone,
                    guest.access_token.as_str(),
                    to_millis(guest.created_at)
                ],
            );
            if let Err(e) = inserted {
                return Err(match unique_violation(&e) {
                    Some(_) => RepositoryError::Duplicate("guest access token"),
                    None => RepositoryError::storage("insert_guest", e.to_string()),
                });
            }

            let id = GuestId(conn.last_insert_rowid());
            Ok(guest.into_guest(id))
        })
        .await
    }

    async fn get_guest(&self, id: GuestId) -> Result<Option<Guest>, RepositoryError> {
        self.with_conn("get_guest", move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM guests WHERE id = ?1", GUEST_COLUMNS),
                params![id.0],
                GuestRow::read,
            )
            .optional()
            .map_err(storage("get_guest"))?
            .map(GuestRow::into_guest)
            .transpose()
        })
        .await
    }

    async fn find_guest_by_token(&self, token: &str) -> Result<Option<Guest>, RepositoryError> {
        let token = token.to_string();
        self.with_conn("find_guest_by_token", move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM guests WHERE access_token = ?1", GUEST_COLUMNS),
                params![token],
                GuestRow::read,
            )
            .optional()
            .map_err(storage("find_guest_by_token"))?
            .map(GuestRow::into_guest)
            .transpose()
        })
        .await
    }

    async fn list_guests(&self, event_id: EventId) -> Result<Vec<Guest>, RepositoryError> {
        self.with_conn("list_guests", move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM guests WHERE event_id = ?1 ORDER BY id",
                    GUEST_COLUMNS
                ))
                .map_err(storage("list_guests"))?;
            let rows = stmt
                .query_map(params![event_id.0], GuestRow::read)
                .map_err(storage("list_guests"))?;

            let mut guests = Vec::new();
            for row in rows {
                guests.push(row.map_err(storage("list_guests"))?.into_guest()?);
            }
            Ok(guests)
        })
        .await
    }

    async fn update_guest_details(
        &self,
        id: GuestId,
        details: &GuestDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Guest>, RepositoryError> {
        let details = details.clone();
        self.with_conn("update_guest_details", move |conn| {
            conn.query_row(
                &format!(
                    "UPDATE guests SET name = ?2, email = ?3, phone = ?4, updated_at = ?5
                     WHERE id = ?1
                     RETURNING {}",
                    GUEST_COLUMNS
                ),
                params![
                    id.0,
                    details.name,
                    details.email,
                    details.phone,
                    to_millis(updated_at)
                ],
                GuestRow::read,
            )
            .optional()
            .map_err(storage("update_guest_details"))?
            .map(GuestRow::into_guest)
            .transpose()
        })
        .await
    }

    async fn record_response(
        &self,
        id: GuestId,
        status: GuestStatus,
        plus_one_count: u32,
        responses: Option<&Responses>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Guest>, RepositoryError> {
        // NULL keeps the stored answers
        let responses = responses
            .map(|r| rows::encode_json(r, "record_response"))
            .transpose()?;
        self.with_conn("record_response", move |conn| {
            conn.query_row(
                &format!(
                    "UPDATE guests
                     SET status = ?2, plus_one_count = ?3,
                         responses = COALESCE(?4, responses), updated_at = ?5
                     WHERE id = ?1
                     RETURNING {}",
                    GUEST_COLUMNS
                ),
                params![
                    id.0,
                    status.as_str(),
                    plus_one_count,
                    responses,
                    to_millis(updated_at)
                ],
                GuestRow::read,
            )
            .optional()
            .map_err(storage("record_response"))?
            .map(GuestRow::into_guest)
            .transpose()
        })
        .await
    }

    async fn record_reminder_sent(
        &self,
        id: GuestId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.with_conn("record_reminder_sent", move |conn| {
            let updated = conn
                .execute(
                    "UPDATE guests SET last_reminder_sent = ?2, updated_at = ?2 WHERE id = ?1",
                    params![id.0, to_millis(at)],
                )
                .map_err(storage("record_reminder_sent"))?;
            Ok(updated > 0)
        })
        .await
    }

    async fn delete_guest(&self, id: GuestId) -> Result<bool, RepositoryError> {
        self.with_conn("delete_guest", move |conn| {
            let deleted = conn
                .execute("DELETE FROM guests WHERE id = ?1", params![id.0])
                .map_err(storage("delete_guest"))?;
            Ok(deleted > 0)
        })
        .await
    }
}
