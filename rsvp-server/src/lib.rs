pub mod api;
pub mod clock;
pub mod config;
pub mod notifier;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{CapturingNotifier, DeliveryError, LogNotifier, Notifier, SmtpNotifier};
pub use repository::{InMemoryRepository, RepositoryError, RsvpRepository, SqliteRepository};
pub use scheduler::{ReminderRunReport, ReminderScheduler, SchedulerHandle};
pub use service::RsvpService;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn get_service_version() -> String {
    // First check for a hash injected by the build environment
    if let Some(git_hash) = option_env!("RSVP_GIT_HASH") {
        git_hash.chars().take(8).collect()
    } else if let Some(git_hash) = built_info::GIT_COMMIT_HASH {
        // Fall back to built crate's git detection (for cargo builds)
        git_hash.chars().take(8).collect()
    } else {
        built_info::PKG_VERSION.to_string()
    }
}

/// Shared state handed to every HTTP handler.
pub struct AppState {
    pub service: RsvpService,
    pub version: String,
}

impl AppState {
    pub fn new(service: RsvpService) -> Self {
        Self {
            service,
            version: get_service_version(),
        }
    }
}
