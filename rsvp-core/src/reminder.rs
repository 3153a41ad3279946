//! Reminder policy: which pending guests get a reminder today.
//!
//! The policy is evaluated by the scheduler once per run. A guest is due when
//! all of the following hold:
//! - the guest is still `pending`;
//! - the event lies in `(now, now + lookahead]`;
//! - the whole number of days until the event is one of the thresholds;
//! - no reminder went out in the last 24 hours.
//!
//! The 24-hour guard keeps repeated runs on the same day from resending. It
//! does not limit reminders per threshold: a guest still pending on two
//! matching days receives one reminder on each.

use chrono::{DateTime, Duration, Utc};

use crate::error::RsvpError;
use crate::event::{Event, EventWithGuests};
use crate::guest::{Guest, GuestStatus};

pub const DEFAULT_THRESHOLD_DAYS: [i64; 3] = [7, 3, 1];
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;
pub const MAX_LOOKAHEAD_DAYS: i64 = 366;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Whole days from `now` until `date`, rounded down.
///
/// Negative when the date has passed.
pub fn days_until(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (date - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    threshold_days: Vec<i64>,
    lookahead: Duration,
    min_interval: Duration,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            threshold_days: DEFAULT_THRESHOLD_DAYS.to_vec(),
            lookahead: Duration::days(DEFAULT_LOOKAHEAD_DAYS),
            min_interval: Duration::days(1),
        }
    }
}

impl ReminderPolicy {
    /// Build a policy from threshold days and a look-ahead window in days.
    ///
    /// Thresholds must be positive; duplicates are ignored. The look-ahead
    /// is at most `MAX_LOOKAHEAD_DAYS`.
    pub fn new(threshold_days: Vec<i64>, lookahead_days: i64) -> Result<Self, RsvpError> {
        if threshold_days.is_empty() {
            return Err(RsvpError::invalid("at least one reminder day is required"));
        }
        if let Some(bad) = threshold_days.iter().find(|d| **d <= 0) {
            return Err(RsvpError::invalid(format!(
                "reminder days must be positive, got {}",
                bad
            )));
        }
        if lookahead_days <= 0 {
            return Err(RsvpError::invalid(format!(
                "reminder look-ahead must be positive, got {}",
                lookahead_days
            )));
        }
        if lookahead_days > MAX_LOOKAHEAD_DAYS {
            return Err(RsvpError::invalid(format!(
                "reminder look-ahead must be at most {} days, got {}",
                MAX_LOOKAHEAD_DAYS, lookahead_days
            )));
        }

        let mut threshold_days = threshold_days;
        threshold_days.sort_unstable_by(|a, b| b.cmp(a));
        threshold_days.dedup();

        Ok(Self {
            threshold_days,
            lookahead: Duration::days(lookahead_days),
            ..Self::default()
        })
    }

    /// Threshold days, largest first.
    pub fn threshold_days(&self) -> &[i64] {
        &self.threshold_days
    }

    /// The event-date window `(start, end]` a run has to look at.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = now
            .checked_add_signed(self.lookahead)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (now, end)
    }

    pub fn event_in_window(&self, event: &Event, now: DateTime<Utc>) -> bool {
        let (start, end) = self.window(now);
        event.date > start && event.date <= end
    }

    /// Decide whether `guest` should be reminded about `event` at `now`.
    pub fn is_due(&self, event: &Event, guest: &Guest, now: DateTime<Utc>) -> bool {
        if guest.status != GuestStatus::Pending {
            return false;
        }
        if !self.event_in_window(event, now) {
            return false;
        }
        if !self.threshold_days.contains(&days_until(event.date, now)) {
            return false;
        }
        match guest.last_reminder_sent {
            None => true,
            Some(last) => now - last >= self.min_interval,
        }
    }

    /// Every reminder due at `now` across `events`, in input order.
    pub fn compute_due_reminders<'a>(
        &self,
        now: DateTime<Utc>,
        events: &'a [EventWithGuests],
    ) -> Vec<DueReminder<'a>> {
        events
            .iter()
            .filter(|entry| self.event_in_window(&entry.event, now))
            .flat_map(|entry| {
                entry
                    .guests
                    .iter()
                    .filter(move |guest| self.is_due(&entry.event, guest, now))
                    .map(move |guest| DueReminder {
                        event: &entry.event,
                        guest,
                        days_until_event: days_until(entry.event.date, now),
                    })
            })
            .collect()
    }
}

/// A reminder the scheduler should send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueReminder<'a> {
    pub event: &'a Event,
    pub guest: &'a Guest,
    pub days_until_event: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CustomFields;
    use crate::guest::{AccessToken, GuestDetails, NewGuest};
    use crate::id::{EventId, GuestId, OrganizerId};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn event_at(id: i64, date: DateTime<Utc>) -> Event {
        Event {
            id: EventId(id),
            organizer_id: OrganizerId(1),
            title: format!("Event {}", id),
            description: None,
            date,
            location: None,
            custom_fields: CustomFields::default(),
            created_at: day0() - Duration::days(30),
        }
    }

    fn guest(id: i64, event_id: i64, status: GuestStatus) -> Guest {
        let mut guest = NewGuest {
            event_id: EventId(event_id),
            details: GuestDetails {
                name: format!("Guest {}", id),
                email: format!("guest{}@example.com", id),
                phone: None,
            },
            access_token: AccessToken::from(format!("token-{}", id)),
            created_at: day0() - Duration::days(20),
        }
        .into_guest(GuestId(id));
        guest.status = status;
        guest
    }

    #[test]
    fn test_days_until_floors() {
        let now = day0();
        assert_eq!(days_until(now + Duration::days(7), now), 7);
        assert_eq!(days_until(now + Duration::days(7) - Duration::seconds(1), now), 6);
        assert_eq!(days_until(now + Duration::hours(1), now), 0);
        assert_eq!(days_until(now - Duration::hours(1), now), -1);
    }

    #[test]
    fn test_fresh_pending_guest_seven_days_out_is_due() {
        let policy = ReminderPolicy::default();
        let event = event_at(1, day0() + Duration::days(7));
        let guest = guest(1, 1, GuestStatus::Pending);
        assert!(policy.is_due(&event, &guest, day0()));
    }

    #[test]
    fn test_not_due_again_same_day() {
        let policy = ReminderPolicy::default();
        let event = event_at(1, day0() + Duration::days(7));
        let mut guest = guest(1, 1, GuestStatus::Pending);
        guest.last_reminder_sent = Some(day0());
        assert!(!policy.is_due(&event, &guest, day0()));
    }

    #[test]
    fn test_responded_guests_never_due() {
        let policy = ReminderPolicy::default();
        let event = event_at(1, day0() + Duration::days(1));
        for status in [GuestStatus::Confirmed, GuestStatus::Declined] {
            assert!(!policy.is_due(&event, &guest(1, 1, status), day0()));
        }
    }

    #[test]
    fn test_only_events_inside_window_are_considered() {
        let policy = ReminderPolicy::default();
        let events = vec![
            EventWithGuests {
                event: event_at(1, day0() + Duration::days(8)),
                guests: vec![guest(1, 1, GuestStatus::Pending)],
            },
            EventWithGuests {
                event: event_at(2, day0() + Duration::days(7)),
                guests: vec![
                    guest(2, 2, GuestStatus::Pending),
                    guest(3, 2, GuestStatus::Confirmed),
                ],
            },
        ];

        let due = policy.compute_due_reminders(day0(), &events);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].guest.id, GuestId(2));
        assert_eq!(due[0].event.id, EventId(2));
        assert_eq!(due[0].days_until_event, 7);
    }

    #[test]
    fn test_past_events_are_ignored() {
        let policy = ReminderPolicy::default();
        let event = event_at(1, day0() - Duration::hours(1));
        assert!(!policy.is_due(&event, &guest(1, 1, GuestStatus::Pending), day0()));
    }

    #[test]
    fn test_non_threshold_days_are_not_due() {
        let policy = ReminderPolicy::default();
        let guest = guest(1, 1, GuestStatus::Pending);
        for days in [2, 4, 5, 6] {
            let event = event_at(1, day0() + Duration::days(days));
            assert!(!policy.is_due(&event, &guest, day0()), "{} days out", days);
        }
        for days in [1, 3, 7] {
            let event = event_at(1, day0() + Duration::days(days));
            assert!(policy.is_due(&event, &guest, day0()), "{} days out", days);
        }
    }

    #[test]
    fn test_reminder_cadence_over_a_week() {
        let policy = ReminderPolicy::default();
        let event = event_at(1, day0() + Duration::days(7));
        let mut guest = guest(1, 1, GuestStatus::Pending);

        // Day 0: seven days out, never reminded.
        assert!(policy.is_due(&event, &guest, day0()));
        guest.last_reminder_sent = Some(day0());

        // Same day again: suppressed.
        assert!(!policy.is_due(&event, &guest, day0()));

        // Day 3: four days out, not a threshold.
        assert!(!policy.is_due(&event, &guest, day0() + Duration::days(3)));

        // Day 4: three days out.
        assert!(policy.is_due(&event, &guest, day0() + Duration::days(4)));
        guest.last_reminder_sent = Some(day0() + Duration::days(4));

        // Day 6: one day out, a second threshold reminder.
        assert!(policy.is_due(&event, &guest, day0() + Duration::days(6)));
    }

    #[test]
    fn test_less_than_a_day_since_last_reminder_is_suppressed() {
        let policy = ReminderPolicy::default();
        let event = event_at(1, day0() + Duration::days(3));
        let mut guest = guest(1, 1, GuestStatus::Pending);
        guest.last_reminder_sent = Some(day0() - Duration::hours(23));
        assert!(!policy.is_due(&event, &guest, day0()));
        guest.last_reminder_sent = Some(day0() - Duration::hours(24));
        assert!(policy.is_due(&event, &guest, day0()));
    }

    #[test]
    fn test_custom_policy() {
        let policy = ReminderPolicy::new(vec![2, 14, 2], 14).unwrap();
        assert_eq!(policy.threshold_days(), &[14, 2]);

        let guest = guest(1, 1, GuestStatus::Pending);
        assert!(policy.is_due(&event_at(1, day0() + Duration::days(14)), &guest, day0()));
        assert!(!policy.is_due(&event_at(1, day0() + Duration::days(7)), &guest, day0()));
    }

    #[test]
    fn test_policy_rejects_bad_configuration() {
        assert!(ReminderPolicy::new(vec![], 7).is_err());
        assert!(ReminderPolicy::new(vec![0, 3], 7).is_err());
        assert!(ReminderPolicy::new(vec![3], 0).is_err());
        assert!(ReminderPolicy::new(vec![3], MAX_LOOKAHEAD_DAYS + 1).is_err());
        assert!(ReminderPolicy::new(vec![3], i64::MAX).is_err());
        assert!(ReminderPolicy::new(vec![3], MAX_LOOKAHEAD_DAYS).is_ok());
    }

    #[test]
    fn test_window_saturates_at_the_end_of_time() {
        let policy = ReminderPolicy::new(vec![1], MAX_LOOKAHEAD_DAYS).unwrap();
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        assert_eq!(policy.window(late), (late, DateTime::<Utc>::MAX_UTC));
        assert_eq!(
            policy.window(day0()).1,
            day0() + Duration::days(MAX_LOOKAHEAD_DAYS)
        );
    }

    fn arb_status() -> impl Strategy<Value = GuestStatus> {
        prop_oneof![
            Just(GuestStatus::Pending),
            Just(GuestStatus::Confirmed),
            Just(GuestStatus::Declined),
        ]
    }

    proptest! {
        /// Guests who responded are never reminded, whatever the date.
        #[test]
        fn responded_guests_are_never_due(
            minutes_out in -20_000i64..20_000,
            status in arb_status(),
        ) {
            let policy = ReminderPolicy::default();
            let event = event_at(1, day0() + Duration::minutes(minutes_out));
            let guest = guest(1, 1, status);
            if status != GuestStatus::Pending {
                prop_assert!(!policy.is_due(&event, &guest, day0()));
            }
        }

        /// Marking a reminder as sent at `now` makes the guest not due at `now`.
        #[test]
        fn marking_sent_suppresses_same_run(minutes_out in -20_000i64..20_000) {
            let policy = ReminderPolicy::default();
            let event = event_at(1, day0() + Duration::minutes(minutes_out));
            let mut guest = guest(1, 1, GuestStatus::Pending);
            guest.last_reminder_sent = Some(day0());
            prop_assert!(!policy.is_due(&event, &guest, day0()));
        }

        /// Anything due lies inside the look-ahead window on a threshold day.
        #[test]
        fn due_implies_window_and_threshold(minutes_out in -20_000i64..20_000) {
            let policy = ReminderPolicy::default();
            let event = event_at(1, day0() + Duration::minutes(minutes_out));
            let guest = guest(1, 1, GuestStatus::Pending);
            if policy.is_due(&event, &guest, day0()) {
                prop_assert!(event.date > day0());
                prop_assert!(event.date <= day0() + Duration::days(7));
                prop_assert!(DEFAULT_THRESHOLD_DAYS.contains(&days_until(event.date, day0())));
            }
        }
    }
}
