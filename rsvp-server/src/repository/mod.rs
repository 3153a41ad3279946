//! Repository abstraction for organizers, events and guests.
//!
//! `RsvpRepository` is the only way the service and the scheduler touch
//! storage. Implementations provide the backend (in-memory, SQLite).
//! Deleting an event must delete its guests.

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use rsvp_core::{
    Event, EventDraft, EventId, Guest, GuestDetails, GuestId, GuestStatus, NewGuest,
    NewOrganizer, Organizer, OrganizerId, Responses, RsvpError,
};

/// Errors from the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The backend failed to perform `operation`.
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("corrupt {0} in database")]
    Corruption(&'static str),

    /// A unique constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: &'static str) -> Self {
        Self::Corruption(what)
    }
}

impl From<RepositoryError> for RsvpError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Duplicate(what) => {
                RsvpError::Conflict(format!("{} already exists", what))
            }
            other => RsvpError::Persistence(other.to_string()),
        }
    }
}

/// Storage operations needed by the RSVP service and the reminder scheduler.
#[async_trait]
pub trait RsvpRepository: Send + Sync {
    // =========================================================================
    // Organizers
    // =========================================================================

    /// Insert an organizer. Emails are unique case-insensitively; a clash
    /// returns `RepositoryError::Duplicate`.
    async fn insert_organizer(
        &self,
        organizer: NewOrganizer,
        api_token_hash: String,
        created_at: DateTime<Utc>,
    ) -> Result<Organizer, RepositoryError>;

    async fn find_organizer_by_token_hash(
        &self,
        api_token_hash: &str,
    ) -> Result<Option<Organizer>, RepositoryError>;

    // =========================================================================
    // Events
    // =========================================================================

    async fn insert_event(
        &self,
        organizer_id: OrganizerId,
        draft: EventDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Event, RepositoryError>;

    /// Replace the editable fields of an event. `None` if it does not exist.
    async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Option<Event>, RepositoryError>;

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, RepositoryError>;

    /// Events of one organizer, soonest first.
    async fn list_events_by_organizer(
        &self,
        organizer_id: OrganizerId,
    ) -> Result<Vec<Event>, RepositoryError>;

    /// Events with `after < date <= until`, soonest first.
    async fn list_events_between(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepositoryError>;

    /// Delete an event and all of its guests. Returns whether it existed.
    async fn delete_event(&self, id: EventId) -> Result<bool, RepositoryError>;

    // =========================================================================
    // Guests
    // =========================================================================

    async fn insert_guest(&self, guest: NewGuest) -> Result<Guest, RepositoryError>;

    async fn get_guest(&self, id: GuestId) -> Result<Option<Guest>, RepositoryError>;

    async fn find_guest_by_token(&self, token: &str) -> Result<Option<Guest>, RepositoryError>;

    /// Guests of one event in invitation order.
    async fn list_guests(&self, event_id: EventId) -> Result<Vec<Guest>, RepositoryError>;

    /// Replace a guest's name, email and phone. RSVP fields stay as stored.
    /// `None` if the guest does not exist.
    async fn update_guest_details(
        &self,
        id: GuestId,
        details: &GuestDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Guest>, RepositoryError>;

    /// Store a guest's RSVP. Contact details stay as stored, and so do the
    /// stored answers when `responses` is `None`. `None` if the guest does
    /// not exist.
    async fn record_response(
        &self,
        id: GuestId,
        status: GuestStatus,
        plus_one_count: u32,
        responses: Option<&Responses>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Guest>, RepositoryError>;

    /// Stamp `last_reminder_sent` (and `updated_at`) with `at`.
    async fn record_reminder_sent(
        &self,
        id: GuestId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn delete_guest(&self, id: GuestId) -> Result<bool, RepositoryError>;
}
