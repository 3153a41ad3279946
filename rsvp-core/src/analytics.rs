//! Attendance figures for organizers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::EventWithGuests;
use crate::guest::{Guest, GuestStatus};

/// Head counts by status. `total_attending` counts each confirmed guest plus
/// their plus-ones; declined guests' plus-ones are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RsvpStats {
    pub confirmed: usize,
    pub declined: usize,
    pub pending: usize,
    pub total_attending: u64,
}

impl RsvpStats {
    pub fn from_guests(guests: &[Guest]) -> Self {
        guests.iter().fold(Self::default(), |mut stats, guest| {
            match guest.status {
                GuestStatus::Confirmed => {
                    stats.confirmed += 1;
                    stats.total_attending += 1 + u64::from(guest.plus_one_count);
                }
                GuestStatus::Declined => stats.declined += 1,
                GuestStatus::Pending => stats.pending += 1,
            }
            stats
        })
    }

    pub fn total_guests(&self) -> usize {
        self.confirmed + self.declined + self.pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponseStats {
    pub total_guests: usize,
    /// Share of guests who confirmed or declined, in `[0, 1]`.
    pub response_rate: f64,
    /// Share of guests who confirmed, in `[0, 1]`.
    pub confirmation_rate: f64,
    pub total_attending: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAnalytics {
    /// Number of guests whose record last changed on each day (`YYYY-MM-DD`).
    pub timeline: BTreeMap<String, usize>,
    pub stats: ResponseStats,
    pub rsvp: RsvpStats,
}

pub fn event_analytics(guests: &[Guest]) -> EventAnalytics {
    let rsvp = RsvpStats::from_guests(guests);

    let mut timeline = BTreeMap::new();
    for guest in guests {
        let day = guest.updated_at.format("%Y-%m-%d").to_string();
        *timeline.entry(day).or_insert(0) += 1;
    }

    let total = rsvp.total_guests();
    EventAnalytics {
        timeline,
        stats: ResponseStats {
            total_guests: total,
            response_rate: ratio(rsvp.confirmed + rsvp.declined, total),
            confirmation_rate: ratio(rsvp.confirmed, total),
            total_attending: rsvp.total_attending,
        },
        rsvp,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrganizerAnalytics {
    pub total_events: usize,
    pub total_guests: usize,
    pub average_response_rate: f64,
    pub average_confirmation_rate: f64,
}

/// Roll-up across all of an organizer's events. Rates are weighted by
/// guest, not averaged per event.
pub fn organizer_analytics(events: &[EventWithGuests]) -> OrganizerAnalytics {
    let mut total_guests = 0;
    let mut responded = 0;
    let mut confirmed = 0;
    for entry in events {
        let stats = RsvpStats::from_guests(&entry.guests);
        total_guests += stats.total_guests();
        responded += stats.confirmed + stats.declined;
        confirmed += stats.confirmed;
    }

    OrganizerAnalytics {
        total_events: events.len(),
        total_guests,
        average_response_rate: ratio(responded, total_guests),
        average_confirmation_rate: ratio(confirmed, total_guests),
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
