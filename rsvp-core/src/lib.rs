//! Domain model for RSVP Desk.
//!
//! Everything in this crate is pure: no I/O, no clocks. Callers pass the
//! current time explicitly, which keeps the RSVP transition and the reminder
//! policy deterministic under test.

pub mod analytics;
pub mod error;
pub mod event;
pub mod export;
pub mod guest;
pub mod id;
pub mod organizer;
pub mod reminder;
pub mod rsvp;

pub use analytics::{
    event_analytics, organizer_analytics, EventAnalytics, OrganizerAnalytics, ResponseStats,
    RsvpStats,
};
pub use error::{RsvpError, RsvpResult};
pub use event::{parse_event_date, CustomFields, Event, EventDraft, EventWithGuests};
pub use export::{export_filename, guests_to_csv, CSV_HEADER};
pub use guest::{AccessToken, Guest, GuestDetails, GuestStatus, NewGuest, Responses};
pub use id::{EventId, GuestId, OrganizerId};
pub use organizer::{NewOrganizer, Organizer, OrganizerContext};
pub use reminder::{days_until, DueReminder, ReminderPolicy};
pub use rsvp::{transition, RsvpSubmission, RsvpTransition};
