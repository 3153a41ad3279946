use thiserror::Error;

/// Failures surfaced by RSVP operations.
///
/// The variants map one-to-one onto the outcomes a caller must distinguish:
/// the HTTP layer turns each into a status code, and the reminder batch uses
/// them to decide whether a single guest failed or the whole run did.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsvpError {
    /// Unknown token, event or guest id.
    #[error("{0} not found")]
    NotFound(String),

    /// Malformed status, date, count or field value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An organizer acting on an event they do not own.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A uniqueness constraint would be violated (e.g. organizer email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The data store rejected a read or write.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl RsvpError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }
}

pub type RsvpResult<T> = Result<T, RsvpError>;
