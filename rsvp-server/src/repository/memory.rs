//! In-memory implementation of `RsvpRepository`.
//!
//! All state is held in one `RwLock`-protected struct and lost on restart.
//! Used in tests and for throwaway local runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RepositoryError, RsvpRepository};
use rsvp_core::{
    Event, EventDraft, EventId, Guest, GuestDetails, GuestId, GuestStatus, NewGuest,
    NewOrganizer, Organizer, OrganizerId, Responses,
};

#[derive(Default)]
struct Tables {
    /// Organizer plus the hash of their API token.
    organizers: BTreeMap<OrganizerId, (Organizer, String)>,
    events: BTreeMap<EventId, Event>,
    guests: BTreeMap<GuestId, Guest>,
    next_id: i64,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory RSVP repository.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_date_then_id(a: &Event, b: &Event) -> std::cmp::Ordering {
    a.date.cmp(&b.date).then(a.id.cmp(&b.id))
}

#[async_trait]
impl RsvpRepository for InMemoryRepository {
    async fn insert_organizer(
        &self,
        organizer: NewOrganizer,
        api_token_hash: String,
        created_at: DateTime<Utc>,
    ) -> Result<Organizer, RepositoryError> {
        let mut tables = self.tables.write().await;
        let clash = tables
            .organizers
            .values()
            .any(|(existing, _)| existing.email.eq_ignore_ascii_case(&organizer.email));
        if clash {
            return Err(RepositoryError::Duplicate("organizer email"));
        }

        let id = OrganizerId(tables.allocate_id());
        let stored = Organizer {
            id,
            name: organizer.name,
            email: organizer.email,
            created_at,
        };
        tables
            .organizers
            .insert(id, (stored.clone(), api_token_hash));
        Ok(stored)
    }

    async fn find_organizer_by_token_hash(
        &self,
        api_token_hash: &str,
    ) -> Result<Option<Organizer>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizers
            .values()
            .find(|(_, hash)| hash == api_token_hash)
            .map(|(organizer, _)| organizer.clone()))
    }

    async fn insert_event(
        &self,
        organizer_id: OrganizerId,
        draft: EventDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Event, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.organizers.contains_key(&organizer_id) {
            return Err(RepositoryError::storage(
                "insert event",
                format!("organizer {} does not exist", organizer_id),
            ));
        }
        let id = EventId(tables.allocate_id());
        let event = draft.into_event(id, organizer_id, created_at);
        tables.events.insert(id, event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Option<Event>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.events.get_mut(&id).map(|event| {
            *event = draft.into_event(event.id, event.organizer_id, event.created_at);
            event.clone()
        }))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(&id).cloned())
    }

    async fn list_events_by_organizer(
        &self,
        organizer_id: OrganizerId,
    ) -> Result<Vec<Event>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| event.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by(by_date_then_id);
        Ok(events)
    }

    async fn list_events_between(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| event.date > after && event.date <= until)
            .cloned()
            .collect();
        events.sort_by(by_date_then_id);
        Ok(events)
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let existed = tables.events.remove(&id).is_some();
        if existed {
            tables.guests.retain(|_, guest| guest.event_id != id);
        }
        Ok(existed)
    }

    async fn insert_guest(&self, guest: NewGuest) -> Result<Guest, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&guest.event_id) {
            return Err(RepositoryError::storage(
                "insert guest",
                format!("event {} does not exist", guest.event_id),
            ));
        }
        let token_clash = tables
            .guests
            .values()
            .any(|existing| existing.access_token == guest.access_token);
        if token_clash {
            return Err(RepositoryError::Duplicate("guest access token"));
        }

        let id = GuestId(tables.allocate_id());
        let guest = guest.into_guest(id);
        tables.guests.insert(id, guest.clone());
        Ok(guest)
    }

    async fn get_guest(&self, id: GuestId) -> Result<Option<Guest>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.guests.get(&id).cloned())
    }

    async fn find_guest_by_token(&self, token: &str) -> Result<Option<Guest>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .guests
            .values()
            .find(|guest| guest.access_token.as_str() == token)
            .cloned())
    }

    async fn list_guests(&self, event_id: EventId) -> Result<Vec<Guest>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .guests
            .values()
            .filter(|guest| guest.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn update_guest_details(
        &self,
        id: GuestId,
        details: &GuestDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Guest>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.guests.get_mut(&id).map(|stored| {
            stored.name = details.name.clone();
            stored.email = details.email.clone();
            stored.phone = details.phone.clone();
            stored.updated_at = updated_at;
            stored.clone()
        }))
    }

    async fn record_response(
        &self,
        id: GuestId,
        status: GuestStatus,
        plus_one_count: u32,
        responses: Option<&Responses>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Guest>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.guests.get_mut(&id).map(|stored| {
            stored.status = status;
            stored.plus_one_count = plus_one_count;
            if let Some(responses) = responses {
                stored.responses = responses.clone();
            }
            stored.updated_at = updated_at;
            stored.clone()
        }))
    }

    async fn record_reminder_sent(
        &self,
        id: GuestId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.guests.get_mut(&id) {
            Some(stored) => {
                stored.last_reminder_sent = Some(at);
                stored.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_guest(&self, id: GuestId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.guests.remove(&id).is_some())
    }
}
