use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RsvpError;
use crate::guest::validate_email;
use crate::id::OrganizerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organizer {
    pub id: OrganizerId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOrganizer {
    pub name: String,
    pub email: String,
}

impl NewOrganizer {
    pub fn validate(self) -> Result<Self, RsvpError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RsvpError::invalid("organizer name must not be empty"));
        }
        let email = validate_email(&self.email)?;
        Ok(Self { name, email })
    }
}

/// The authenticated organizer on whose behalf a request runs.
///
/// Built once per request from the bearer token and passed by reference into
/// every organizer-scoped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerContext {
    pub organizer: Organizer,
}

impl OrganizerContext {
    pub fn new(organizer: Organizer) -> Self {
        Self { organizer }
    }

    pub fn id(&self) -> OrganizerId {
        self.organizer.id
    }
}
