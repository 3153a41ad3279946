//! Organizer and guest operations.
//!
//! `RsvpService` owns no state of its own; it validates input, checks event
//! ownership against the caller's `OrganizerContext`, and delegates to the
//! repository, notifier and clock it was built with.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::notifier::templates::{invitation_email, reminder_email, rsvp_link};
use crate::notifier::Notifier;
use crate::repository::RsvpRepository;
use rsvp_core::{
    event_analytics, export_filename, guests_to_csv, organizer_analytics, transition, AccessToken,
    Event, EventAnalytics, EventDraft, EventId, EventWithGuests, Guest, GuestDetails, GuestId,
    GuestStatus, NewGuest, NewOrganizer, Organizer, OrganizerAnalytics, OrganizerContext,
    RsvpError, RsvpResult, RsvpSubmission,
};

/// A freshly registered organizer and the only copy of their API token.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub organizer: Organizer,
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Invitation {
    pub guest: Guest,
    pub rsvp_link: String,
    /// False if the invitation email could not be delivered. The guest is
    /// still created and the link can be shared by other means.
    pub email_sent: bool,
}

/// What a guest sees when opening their RSVP link.
#[derive(Debug, Clone, Serialize)]
pub struct RsvpView {
    pub event: Event,
    pub guest: Guest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkReminderReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

pub struct RsvpService {
    repo: Arc<dyn RsvpRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

/// Hex SHA-256 of an API token. Only the hash is stored.
pub fn hash_api_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl RsvpService {
    pub fn new(
        repo: Arc<dyn RsvpRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            notifier,
            clock,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    // =========================================================================
    // Organizers
    // =========================================================================

    pub async fn register_organizer(&self, organizer: NewOrganizer) -> RsvpResult<Registration> {
        let organizer = organizer.validate()?;
        let api_token = AccessToken::generate();
        let organizer = self
            .repo
            .insert_organizer(
                organizer,
                hash_api_token(api_token.as_str()),
                self.clock.now(),
            )
            .await?;
        info!("Registered organizer {} <{}>", organizer.id, organizer.email);
        Ok(Registration {
            organizer,
            api_token: api_token.as_str().to_string(),
        })
    }

    /// Resolve a bearer token to the organizer it was issued to.
    pub async fn authenticate(&self, api_token: &str) -> RsvpResult<OrganizerContext> {
        let organizer = self
            .repo
            .find_organizer_by_token_hash(&hash_api_token(api_token.trim()))
            .await?
            .ok_or_else(|| RsvpError::unauthorized("invalid api token"))?;
        Ok(OrganizerContext::new(organizer))
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub async fn create_event(&self, ctx: &OrganizerContext, draft: EventDraft) -> RsvpResult<Event> {
        let draft = draft.validate()?;
        let event = self
            .repo
            .insert_event(ctx.id(), draft, self.clock.now())
            .await?;
        info!("Organizer {} created event {} '{}'", ctx.id(), event.id, event.title);
        Ok(event)
    }

    pub async fn update_event(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        draft: EventDraft,
    ) -> RsvpResult<Event> {
        let draft = draft.validate()?;
        self.owned_event(ctx, event_id).await?;
        self.repo
            .update_event(event_id, draft)
            .await?
            .ok_or_else(|| RsvpError::not_found(format!("event {}", event_id)))
    }

    pub async fn get_event(&self, ctx: &OrganizerContext, event_id: EventId) -> RsvpResult<Event> {
        self.owned_event(ctx, event_id).await
    }

    pub async fn list_events(&self, ctx: &OrganizerContext) -> RsvpResult<Vec<Event>> {
        Ok(self.repo.list_events_by_organizer(ctx.id()).await?)
    }

    pub async fn delete_event(&self, ctx: &OrganizerContext, event_id: EventId) -> RsvpResult<()> {
        self.owned_event(ctx, event_id).await?;
        if !self.repo.delete_event(event_id).await? {
            return Err(RsvpError::not_found(format!("event {}", event_id)));
        }
        info!("Organizer {} deleted event {}", ctx.id(), event_id);
        Ok(())
    }

    // =========================================================================
    // Guests
    // =========================================================================

    /// Create a guest and email them their RSVP link.
    pub async fn invite_guest(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        details: GuestDetails,
    ) -> RsvpResult<Invitation> {
        let details = details.validate()?;
        let event = self.owned_event(ctx, event_id).await?;

        let guest = self
            .repo
            .insert_guest(NewGuest::new(event_id, details, self.clock.now()))
            .await?;
        let link = rsvp_link(&self.public_base_url, &guest);

        let email = invitation_email(&event, &guest, &link);
        let email_sent = match self
            .notifier
            .send(&guest.email, &email.subject, &email.html_body)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to send invitation to {} for event {}: {}",
                    guest.email, event_id, e
                );
                false
            }
        };

        info!(
            "Invited guest {} to event {} (email sent: {})",
            guest.id, event_id, email_sent
        );
        Ok(Invitation {
            guest,
            rsvp_link: link,
            email_sent,
        })
    }

    pub async fn list_guests(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
    ) -> RsvpResult<Vec<Guest>> {
        self.owned_event(ctx, event_id).await?;
        Ok(self.repo.list_guests(event_id).await?)
    }

    pub async fn update_guest(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        guest_id: GuestId,
        details: GuestDetails,
    ) -> RsvpResult<Guest> {
        let details = details.validate()?;
        self.owned_event(ctx, event_id).await?;
        self.guest_of_event(event_id, guest_id).await?;

        self.repo
            .update_guest_details(guest_id, &details, self.clock.now())
            .await?
            .ok_or_else(|| RsvpError::not_found(format!("guest {}", guest_id)))
    }

    pub async fn delete_guest(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        guest_id: GuestId,
    ) -> RsvpResult<()> {
        self.owned_event(ctx, event_id).await?;
        self.guest_of_event(event_id, guest_id).await?;
        if !self.repo.delete_guest(guest_id).await? {
            return Err(RsvpError::not_found(format!("guest {}", guest_id)));
        }
        Ok(())
    }

    // =========================================================================
    // Guest-facing RSVP
    // =========================================================================

    pub async fn find_guest_by_token(&self, token: &str) -> RsvpResult<Guest> {
        self.repo
            .find_guest_by_token(token)
            .await?
            .ok_or_else(|| RsvpError::not_found("rsvp link"))
    }

    pub async fn get_rsvp(&self, token: &str) -> RsvpResult<RsvpView> {
        let guest = self.find_guest_by_token(token).await?;
        let event = self
            .repo
            .get_event(guest.event_id)
            .await?
            .ok_or_else(|| RsvpError::not_found(format!("event {}", guest.event_id)))?;
        Ok(RsvpView { event, guest })
    }

    /// Record a guest's answer.
    ///
    /// The token is resolved before the submission is validated, so an
    /// unknown token is `NotFound` even when the body is also malformed. A
    /// rejected submission leaves the stored guest untouched.
    pub async fn submit_response(
        &self,
        token: &str,
        status: &str,
        plus_one_count: Option<i64>,
        responses: Option<serde_json::Value>,
    ) -> RsvpResult<Guest> {
        let guest = self.find_guest_by_token(token).await?;
        let submission = RsvpSubmission::parse(status, plus_one_count, responses)?;

        let change = transition(&guest, submission, self.clock.now());
        let stored = self
            .repo
            .record_response(
                guest.id,
                change.to(),
                change.guest.plus_one_count,
                change.responses_replaced.then_some(&change.guest.responses),
                change.guest.updated_at,
            )
            .await?
            .ok_or_else(|| RsvpError::not_found("rsvp link"))?;

        info!(
            "Guest {} of event {} responded: {} -> {} (+{})",
            stored.id, stored.event_id, change.from, stored.status, stored.plus_one_count
        );
        Ok(stored)
    }

    // =========================================================================
    // Analytics, reminders, export
    // =========================================================================

    pub async fn event_analytics(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
    ) -> RsvpResult<EventAnalytics> {
        let guests = self.list_guests(ctx, event_id).await?;
        Ok(event_analytics(&guests))
    }

    pub async fn organizer_analytics(&self, ctx: &OrganizerContext) -> RsvpResult<OrganizerAnalytics> {
        let events = self.repo.list_events_by_organizer(ctx.id()).await?;
        let mut with_guests = Vec::with_capacity(events.len());
        for event in events {
            let guests = self.repo.list_guests(event.id).await?;
            with_guests.push(EventWithGuests { event, guests });
        }
        Ok(organizer_analytics(&with_guests))
    }

    /// Remind every pending guest of an event now, regardless of how close
    /// the event is or when they were last reminded.
    pub async fn send_bulk_reminders(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
    ) -> RsvpResult<BulkReminderReport> {
        let event = self.owned_event(ctx, event_id).await?;
        let guests = self.repo.list_guests(event_id).await?;

        let mut report = BulkReminderReport::default();
        for guest in guests.iter().filter(|g| g.status == GuestStatus::Pending) {
            let link = rsvp_link(&self.public_base_url, guest);
            let email = reminder_email(&event, guest, &link);
            if let Err(e) = self
                .notifier
                .send(&guest.email, &email.subject, &email.html_body)
                .await
            {
                warn!("Failed to send reminder to {}: {}", guest.email, e);
                report.failed += 1;
                continue;
            }
            if let Err(e) = self
                .repo
                .record_reminder_sent(guest.id, self.clock.now())
                .await
            {
                warn!("Reminder sent to guest {} but not recorded: {}", guest.id, e);
            }
            report.sent += 1;
        }

        info!(
            "Bulk reminders for event {}: {} sent, {} failed",
            event_id, report.sent, report.failed
        );
        Ok(report)
    }

    pub async fn export_guests_csv(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
    ) -> RsvpResult<CsvExport> {
        let event = self.owned_event(ctx, event_id).await?;
        let guests = self.repo.list_guests(event_id).await?;
        let body = guests_to_csv(&guests)
            .map_err(|e| RsvpError::Persistence(format!("failed to write CSV: {}", e)))?;
        Ok(CsvExport {
            filename: export_filename(&event.title),
            body,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn owned_event(&self, ctx: &OrganizerContext, event_id: EventId) -> RsvpResult<Event> {
        let event = self
            .repo
            .get_event(event_id)
            .await?
            .ok_or_else(|| RsvpError::not_found(format!("event {}", event_id)))?;
        if !event.is_owned_by(ctx.id()) {
            return Err(RsvpError::unauthorized(format!(
                "event {} belongs to another organizer",
                event_id
            )));
        }
        Ok(event)
    }

    /// A guest id that exists but belongs to another event is `NotFound`.
    async fn guest_of_event(&self, event_id: EventId, guest_id: GuestId) -> RsvpResult<Guest> {
        self.repo
            .get_guest(guest_id)
            .await?
            .filter(|guest| guest.event_id == event_id)
            .ok_or_else(|| RsvpError::not_found(format!("guest {}", guest_id)))
    }
}
