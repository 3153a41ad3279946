//! Newtype identifiers so an event id can never be passed where a guest id
//! is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Primary key of an organizer account.
    OrganizerId
);
row_id!(
    /// Primary key of an event.
    EventId
);
row_id!(
    /// Primary key of a guest. Distinct from the guest's access token, which
    /// is the only identifier ever handed to the guest.
    GuestId
);
