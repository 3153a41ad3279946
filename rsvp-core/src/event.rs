//! Events and the organizer-supplied details attached to them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RsvpError;
use crate::guest::Guest;
use crate::id::{EventId, OrganizerId};

/// Extra questions and notes the organizer attaches to an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomFields {
    #[serde(default)]
    pub meal_options: Vec<String>,
    #[serde(default)]
    pub dress_code: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

impl CustomFields {
    /// Drop blank meal options and collapse blank text to `None`.
    fn normalized(self) -> Self {
        Self {
            meal_options: self
                .meal_options
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            dress_code: non_blank(self.dress_code),
            additional_info: non_blank(self.additional_info),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: EventId,
    pub organizer_id: OrganizerId,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub custom_fields: CustomFields,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_owned_by(&self, organizer_id: OrganizerId) -> bool {
        self.organizer_id == organizer_id
    }
}

/// The organizer-editable part of an event, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub custom_fields: CustomFields,
}

impl EventDraft {
    pub const MAX_TITLE_LEN: usize = 255;

    pub fn validate(self) -> Result<Self, RsvpError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(RsvpError::invalid("event title must not be empty"));
        }
        if title.len() > Self::MAX_TITLE_LEN {
            return Err(RsvpError::invalid(format!(
                "event title exceeds {} bytes",
                Self::MAX_TITLE_LEN
            )));
        }

        Ok(Self {
            title,
            description: non_blank(self.description),
            date: self.date,
            location: non_blank(self.location),
            custom_fields: self.custom_fields.normalized(),
        })
    }

    pub fn into_event(
        self,
        id: EventId,
        organizer_id: OrganizerId,
        created_at: DateTime<Utc>,
    ) -> Event {
        Event {
            id,
            organizer_id,
            title: self.title,
            description: self.description,
            date: self.date,
            location: self.location,
            custom_fields: self.custom_fields,
            created_at,
        }
    }
}

/// An event together with all of its guests, the unit the reminder policy
/// and analytics work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWithGuests {
    pub event: Event,
    pub guests: Vec<Guest>,
}

/// Parse an event date.
///
/// Accepts RFC 3339 (`2026-06-01T18:30:00+02:00`) or the form-style
/// `2026-06-01T18:30` / `2026-06-01T18:30:00`, which are read as UTC.
pub fn parse_event_date(raw: &str) -> Result<DateTime<Utc>, RsvpError> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(RsvpError::invalid(format!(
        "'{}' is not a valid date, expected RFC 3339 or YYYY-MM-DDTHH:MM",
        raw
    )))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            description: Some("  ".to_string()),
            date: Utc.with_ymd_and_hms(2026, 6, 1, 18, 30, 0).unwrap(),
            location: Some(" Town Hall ".to_string()),
            custom_fields: CustomFields {
                meal_options: vec!["veg".to_string(), " ".to_string(), " fish ".to_string()],
                dress_code: Some(String::new()),
                additional_info: None,
            },
        }
    }

    #[test]
    fn test_parse_form_style_date() {
        assert_eq!(
            parse_event_date("2026-06-01T18:30").unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 1, 18, 30, 0).unwrap()
        );
        assert_eq!(
            parse_event_date("2026-06-01T18:30:15").unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 1, 18, 30, 15).unwrap()
        );
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        assert_eq!(
            parse_event_date("2026-06-01T18:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 1, 16, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "tomorrow", "2026-06-01", "01/06/2026 18:30"] {
            let err = parse_event_date(raw).unwrap_err();
            assert!(matches!(err, RsvpError::InvalidArgument(_)), "{:?}", raw);
        }
    }

    #[test]
    fn test_draft_validation_normalizes() {
        let draft = draft("  Summer party ").validate().unwrap();
        assert_eq!(draft.title, "Summer party");
        assert_eq!(draft.description, None);
        assert_eq!(draft.location.as_deref(), Some("Town Hall"));
        assert_eq!(draft.custom_fields.meal_options, vec!["veg", "fish"]);
        assert_eq!(draft.custom_fields.dress_code, None);
    }

    #[test]
    fn test_draft_rejects_blank_title() {
        assert!(draft("   ").validate().is_err());
    }

    #[test]
    fn test_custom_fields_deserialize_with_defaults() {
        let fields: CustomFields = serde_json::from_str(r#"{"dress_code":"black tie"}"#).unwrap();
        assert!(fields.meal_options.is_empty());
        assert_eq!(fields.dress_code.as_deref(), Some("black tie"));
    }
}
