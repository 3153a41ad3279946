//! Pure RSVP transition function.
//!
//! A guest's status is a three-state machine (`pending`, `confirmed`,
//! `declined`) with no restricted edges: any submission through the guest's
//! link moves them to the submitted state. The transition itself has no side
//! effects; the caller persists the returned guest.

use chrono::{DateTime, Utc};

use crate::error::RsvpError;
use crate::guest::{Guest, GuestStatus, Responses};

/// A validated guest response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpSubmission {
    pub status: GuestStatus,
    pub plus_one_count: u32,
    /// `None` keeps the guest's stored answers.
    pub responses: Option<Responses>,
}

impl RsvpSubmission {
    /// Validate the raw fields of a submission.
    ///
    /// `plus_one_count` defaults to 0 and must be non-negative. A non-empty
    /// `responses` mapping replaces the stored answers; an omitted, `null` or
    /// empty one leaves them as they are.
    pub fn parse(
        status: &str,
        plus_one_count: Option<i64>,
        responses: Option<serde_json::Value>,
    ) -> Result<Self, RsvpError> {
        let status: GuestStatus = status.parse()?;

        let plus_one_count = match plus_one_count {
            None => 0,
            Some(n) => u32::try_from(n).map_err(|_| {
                RsvpError::invalid(format!(
                    "plus_one_count must be a non-negative integer, got {}",
                    n
                ))
            })?,
        };

        let responses = responses
            .map(Responses::from_json)
            .transpose()?
            .filter(|answers| !answers.is_empty());

        Ok(Self {
            status,
            plus_one_count,
            responses,
        })
    }
}

/// Result of applying a submission to a guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpTransition {
    pub from: GuestStatus,
    pub guest: Guest,
    /// Whether the submission carried answers that replaced the stored ones.
    pub responses_replaced: bool,
}

impl RsvpTransition {
    pub fn to(&self) -> GuestStatus {
        self.guest.status
    }

    pub fn status_changed(&self) -> bool {
        self.from != self.guest.status
    }
}

/// Apply a submission to a guest.
///
/// Overwrites status and plus-one count, replaces the responses when the
/// submission carries any, and stamps `updated_at`. The plus-one count is kept as submitted even when declining; only
/// confirmed guests contribute it to attendance totals.
pub fn transition(
    guest: &Guest,
    submission: RsvpSubmission,
    now: DateTime<Utc>,
) -> RsvpTransition {
    let mut updated = guest.clone();
    updated.status = submission.status;
    updated.plus_one_count = submission.plus_one_count;
    let responses_replaced = submission.responses.is_some();
    if let Some(responses) = submission.responses {
        updated.responses = responses;
    }
    updated.updated_at = now;

    RsvpTransition {
        from: guest.status,
        guest: updated,
        responses_replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::{AccessToken, GuestDetails, NewGuest};
    use crate::id::{EventId, GuestId};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn pending_guest() -> Guest {
        NewGuest {
            event_id: EventId(1),
            details: GuestDetails {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                phone: None,
            },
            access_token: AccessToken::from("token-grace"),
            created_at: created_at(),
        }
        .into_guest(GuestId(1))
    }

    #[test]
    fn test_confirm_with_plus_ones() {
        let now = created_at() + Duration::hours(3);
        let submission = RsvpSubmission::parse("confirmed", Some(2), None).unwrap();
        let result = transition(&pending_guest(), submission, now);

        assert_eq!(result.from, GuestStatus::Pending);
        assert_eq!(result.to(), GuestStatus::Confirmed);
        assert_eq!(result.guest.plus_one_count, 2);
        assert_eq!(result.guest.updated_at, now);
        assert!(result.status_changed());
    }

    #[test]
    fn test_plus_one_count_defaults_to_zero() {
        let submission = RsvpSubmission::parse("confirmed", None, None).unwrap();
        assert_eq!(submission.plus_one_count, 0);
    }

    #[test]
    fn test_negative_plus_one_count_rejected() {
        let err = RsvpSubmission::parse("confirmed", Some(-1), None).unwrap_err();
        assert!(matches!(err, RsvpError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = RsvpSubmission::parse("attending", Some(1), None).unwrap_err();
        assert!(matches!(err, RsvpError::InvalidArgument(_)));
    }

    #[test]
    fn test_decline_keeps_plus_one_count() {
        let mut guest = pending_guest();
        guest.status = GuestStatus::Confirmed;
        guest.plus_one_count = 3;

        let submission = RsvpSubmission::parse("declined", Some(3), None).unwrap();
        let result = transition(&guest, submission, created_at());
        assert_eq!(result.to(), GuestStatus::Declined);
        assert_eq!(result.guest.plus_one_count, 3);
    }

    #[test]
    fn test_responses_are_replaced_not_merged() {
        let first = RsvpSubmission::parse(
            "confirmed",
            None,
            Some(json!({"meal": "veg", "song": "Mr. Blue Sky"})),
        )
        .unwrap();
        let guest = transition(&pending_guest(), first, created_at()).guest;

        let second = RsvpSubmission::parse("confirmed", None, Some(json!({"meal": "fish"}))).unwrap();
        let guest = transition(&guest, second, created_at()).guest;

        assert_eq!(guest.responses.get("meal"), Some("fish"));
        assert_eq!(guest.responses.get("song"), None);
    }

    #[test]
    fn test_omitted_or_empty_responses_keep_previous_answers() {
        let first =
            RsvpSubmission::parse("confirmed", None, Some(json!({"meal": "veg"}))).unwrap();
        let first = transition(&pending_guest(), first, created_at());
        assert!(first.responses_replaced);
        let guest = first.guest;

        for responses in [None, Some(json!(null)), Some(json!({}))] {
            let submission = RsvpSubmission::parse("declined", None, responses).unwrap();
            assert_eq!(submission.responses, None);
            let result = transition(&guest, submission, created_at());
            assert!(!result.responses_replaced);
            assert_eq!(result.guest.status, GuestStatus::Declined);
            assert_eq!(result.guest.responses.get("meal"), Some("veg"));
        }
    }

    #[test]
    fn test_transition_preserves_identity_fields() {
        let guest = pending_guest();
        let submission = RsvpSubmission::parse("declined", None, None).unwrap();
        let updated = transition(&guest, submission, created_at() + Duration::days(1)).guest;

        assert_eq!(updated.id, guest.id);
        assert_eq!(updated.access_token, guest.access_token);
        assert_eq!(updated.created_at, guest.created_at);
        assert_eq!(updated.last_reminder_sent, guest.last_reminder_sent);
    }

    fn arb_status() -> impl Strategy<Value = GuestStatus> {
        prop_oneof![
            Just(GuestStatus::Pending),
            Just(GuestStatus::Confirmed),
            Just(GuestStatus::Declined),
        ]
    }

    proptest! {
        /// Every state is reachable from every other state in one step.
        #[test]
        fn any_state_reaches_any_state(from in arb_status(), to in arb_status(), count in 0i64..100) {
            let mut guest = pending_guest();
            guest.status = from;

            let submission = RsvpSubmission::parse(to.as_str(), Some(count), None).unwrap();
            let result = transition(&guest, submission, created_at());

            prop_assert_eq!(result.from, from);
            prop_assert_eq!(result.guest.status, to);
            prop_assert_eq!(i64::from(result.guest.plus_one_count), count);
        }

        /// Applying the same submission twice yields the same stored guest.
        #[test]
        fn identical_submissions_are_idempotent(to in arb_status(), count in 0i64..100) {
            let submission = RsvpSubmission::parse(to.as_str(), Some(count), Some(json!({"meal": "veg"}))).unwrap();
            let once = transition(&pending_guest(), submission.clone(), created_at()).guest;
            let twice = transition(&once, submission, created_at()).guest;
            prop_assert_eq!(once, twice);
        }
    }
}
