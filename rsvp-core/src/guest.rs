//! Guest records and the values stored on them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::RsvpError;
use crate::id::{EventId, GuestId};

/// Where a guest stands on their invitation.
///
/// `Pending` is the initial state. No transition is restricted: a guest can
/// resubmit through their link and move between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    #[default]
    Pending,
    Confirmed,
    Declined,
}

impl GuestStatus {
    pub const ALL: [GuestStatus; 3] = [Self::Pending, Self::Confirmed, Self::Declined];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuestStatus {
    type Err = RsvpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "declined" => Ok(Self::Declined),
            other => Err(RsvpError::invalid(format!(
                "unknown RSVP status '{}', expected one of pending, confirmed, declined",
                other
            ))),
        }
    }
}

/// Opaque bearer credential embedded in a guest's RSVP link.
///
/// Generated once from 32 bytes of OS randomness and never reassigned.
/// Holding the token is the only proof a request needs to act on the guest.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    const ENTROPY_BYTES: usize = 32;

    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// Tokens end up in log lines via `{:?}` on guests; only print a prefix.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "AccessToken({}…)", prefix)
    }
}

/// A guest's answers to the event's custom questions.
///
/// Keys are custom-field names, values are free-form text. Submissions
/// replace the whole mapping; they never merge into the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Responses(BTreeMap<String, String>);

impl Responses {
    pub const MAX_ENTRIES: usize = 64;
    pub const MAX_KEY_LEN: usize = 100;
    pub const MAX_VALUE_LEN: usize = 2000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Validate an untrusted JSON value into a response mapping.
    ///
    /// Accepts `null` (no answers) or an object whose values are strings,
    /// numbers, booleans, or arrays of those (joined with ", "). Nested
    /// objects are rejected, as are blank keys and oversized entries.
    pub fn from_json(value: serde_json::Value) -> Result<Self, RsvpError> {
        let object = match value {
            serde_json::Value::Null => return Ok(Self::new()),
            serde_json::Value::Object(object) => object,
            other => {
                return Err(RsvpError::invalid(format!(
                    "responses must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if object.len() > Self::MAX_ENTRIES {
            return Err(RsvpError::invalid(format!(
                "too many responses ({}, at most {})",
                object.len(),
                Self::MAX_ENTRIES
            )));
        }

        let mut answers = BTreeMap::new();
        for (key, value) in object {
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(RsvpError::invalid("response keys must not be blank"));
            }
            if key.len() > Self::MAX_KEY_LEN {
                return Err(RsvpError::invalid(format!(
                    "response key '{}…' exceeds {} bytes",
                    key.chars().take(20).collect::<String>(),
                    Self::MAX_KEY_LEN
                )));
            }

            let Some(text) = answer_text(&key, value)? else {
                continue;
            };
            if text.len() > Self::MAX_VALUE_LEN {
                return Err(RsvpError::invalid(format!(
                    "response '{}' exceeds {} bytes",
                    key,
                    Self::MAX_VALUE_LEN
                )));
            }
            answers.insert(key, text);
        }

        Ok(Self(answers))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Responses {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Flatten one answer to text. `None` means the answer was `null` and is dropped.
fn answer_text(key: &str, value: serde_json::Value) -> Result<Option<String>, RsvpError> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => parts.push(s),
                    Value::Bool(b) => parts.push(b.to_string()),
                    Value::Number(n) => parts.push(n.to_string()),
                    Value::Null => {}
                    other => {
                        return Err(RsvpError::invalid(format!(
                            "response '{}' contains {}, expected plain values",
                            key,
                            json_kind(&other)
                        )))
                    }
                }
            }
            Ok(Some(parts.join(", ")))
        }
        Value::Object(_) => Err(RsvpError::invalid(format!(
            "response '{}' must not be an object",
            key
        ))),
    }
}

/// A persisted guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guest {
    pub id: GuestId,
    pub event_id: EventId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: GuestStatus,
    /// Extra attendees the guest brings. Only counted while confirmed.
    pub plus_one_count: u32,
    pub responses: Responses,
    pub access_token: AccessToken,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organizer-editable contact details of a guest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestDetails {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl GuestDetails {
    pub const MAX_NAME_LEN: usize = 255;
    pub const MAX_PHONE_LEN: usize = 20;

    /// Trim fields and reject blank names, implausible emails and long phones.
    pub fn validate(self) -> Result<Self, RsvpError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RsvpError::invalid("guest name must not be empty"));
        }
        if name.len() > Self::MAX_NAME_LEN {
            return Err(RsvpError::invalid(format!(
                "guest name exceeds {} bytes",
                Self::MAX_NAME_LEN
            )));
        }

        let email = validate_email(&self.email)?;

        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(phone) = &phone {
            if phone.len() > Self::MAX_PHONE_LEN {
                return Err(RsvpError::invalid(format!(
                    "phone number exceeds {} characters",
                    Self::MAX_PHONE_LEN
                )));
            }
        }

        Ok(Self { name, email, phone })
    }
}

/// Minimal shape check; deliverability is the mail server's problem.
pub(crate) fn validate_email(raw: &str) -> Result<String, RsvpError> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(RsvpError::invalid(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(email.to_string())
}

/// Everything needed to insert a freshly invited guest.
#[derive(Debug, Clone)]
pub struct NewGuest {
    pub event_id: EventId,
    pub details: GuestDetails,
    pub access_token: AccessToken,
    pub created_at: DateTime<Utc>,
}

impl NewGuest {
    pub fn new(event_id: EventId, details: GuestDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            details,
            access_token: AccessToken::generate(),
            created_at,
        }
    }

    /// The guest as it looks once the store has assigned `id`.
    pub fn into_guest(self, id: GuestId) -> Guest {
        Guest {
            id,
            event_id: self.event_id,
            name: self.details.name,
            email: self.details.email,
            phone: self.details.phone,
            status: GuestStatus::Pending,
            plus_one_count: 0,
            responses: Responses::new(),
            access_token: self.access_token,
            last_reminder_sent: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
