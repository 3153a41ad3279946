//! Raw row shapes and their decoding into domain types.

use rusqlite::{MappedRows, Row};
use serde::Serialize;

use super::from_millis;
use crate::repository::RepositoryError;
use rsvp_core::{
    AccessToken, CustomFields, Event, EventId, Guest, GuestId, GuestStatus, Organizer,
    OrganizerId, Responses,
};

pub(super) const EVENT_COLUMNS: &str =
    "id, organizer_id, title, description, date, location, custom_fields, created_at";

pub(super) const GUEST_COLUMNS: &str = "id, event_id, name, email, phone, status, \
     plus_one_count, responses, access_token, last_reminder_sent, created_at, updated_at";

pub(super) fn encode_json<T: Serialize>(
    value: &T,
    operation: &'static str,
) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::storage(operation, e.to_string()))
}

pub(super) struct OrganizerRow {
    id: i64,
    name: String,
    email: String,
    created_at: i64,
}

impl OrganizerRow {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub(super) fn into_organizer(self) -> Result<Organizer, RepositoryError> {
        Ok(Organizer {
            id: OrganizerId(self.id),
            name: self.name,
            email: self.email,
            created_at: from_millis(self.created_at, "organizer created_at")?,
        })
    }
}

/// Columns in `EVENT_COLUMNS` order.
pub(super) struct EventRow {
    id: i64,
    organizer_id: i64,
    title: String,
    description: Option<String>,
    date: i64,
    location: Option<String>,
    custom_fields: String,
    created_at: i64,
}

impl EventRow {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            organizer_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            date: row.get(4)?,
            location: row.get(5)?,
            custom_fields: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub(super) fn into_event(self) -> Result<Event, RepositoryError> {
        let custom_fields: CustomFields = serde_json::from_str(&self.custom_fields)
            .map_err(|_| RepositoryError::corruption("event custom_fields JSON"))?;
        Ok(Event {
            id: EventId(self.id),
            organizer_id: OrganizerId(self.organizer_id),
            title: self.title,
            description: self.description,
            date: from_millis(self.date, "event date")?,
            location: self.location,
            custom_fields,
            created_at: from_millis(self.created_at, "event created_at")?,
        })
    }
}

pub(super) fn collect_events<F>(
    rows: MappedRows<'_, F>,
    operation: &'static str,
) -> Result<Vec<Event>, RepositoryError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<EventRow>,
{
    let mut events = Vec::new();
    for row in rows {
        let row = row.map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
        events.push(row.into_event()?);
    }
    Ok(events)
}

/// Columns in `GUEST_COLUMNS` order.
pub(super) struct GuestRow {
    id: i64,
    event_id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    status: String,
    plus_one_count: i64,
    responses: String,
    access_token: String,
    last_reminder_sent: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl GuestRow {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            status: row.get(5)?,
            plus_one_count: row.get(6)?,
            responses: row.get(7)?,
            access_token: row.get(8)?,
            last_reminder_sent: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    pub(super) fn into_guest(self) -> Result<Guest, RepositoryError> {
        let status: GuestStatus = self
            .status
            .parse()
            .map_err(|_| RepositoryError::corruption("guest status"))?;
        let plus_one_count = u32::try_from(self.plus_one_count)
            .map_err(|_| RepositoryError::corruption("guest plus_one_count"))?;
        let responses: Responses = serde_json::from_str(&self.responses)
            .map_err(|_| RepositoryError::corruption("guest responses JSON"))?;
        let last_reminder_sent = self
            .last_reminder_sent
            .map(|millis| from_millis(millis, "guest last_reminder_sent"))
            .transpose()?;

        Ok(Guest {
            id: GuestId(self.id),
            event_id: EventId(self.event_id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            status,
            plus_one_count,
            responses,
            access_token: AccessToken::from(self.access_token),
            last_reminder_sent,
            created_at: from_millis(self.created_at, "guest created_at")?,
            updated_at: from_millis(self.updated_at, "guest updated_at")?,
        })
    }
}
