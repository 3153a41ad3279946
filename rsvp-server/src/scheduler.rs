//! Periodic reminder dispatch.
//!
//! `ReminderScheduler` is built by `main` with its collaborators and runs on
//! a fixed interval until stopped. Each run loads the events in the policy
//! window, asks the policy which pending guests are due, and emails them.
//! A failed send or write is logged and counted; it never stops the run.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::notifier::templates::{reminder_email, rsvp_link};
use crate::notifier::Notifier;
use crate::repository::{RepositoryError, RsvpRepository};
use rsvp_core::{EventWithGuests, ReminderPolicy};

/// Outcome of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunReport {
    pub events_considered: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderScheduler {
    repo: Arc<dyn RsvpRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: ReminderPolicy,
    public_base_url: String,
    interval: Duration,
}

/// A running scheduler loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to exit and wait for it. A run already in progress
    /// finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Reminder scheduler task ended abnormally: {}", e);
        }
    }
}

impl ReminderScheduler {
    pub fn new(
        repo: Arc<dyn RsvpRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: ReminderPolicy,
        public_base_url: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            repo,
            notifier,
            clock,
            policy,
            public_base_url: public_base_url.into(),
            interval,
        }
    }

    /// Spawn the loop. The first run happens immediately.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let scheduler = self;

        let task = tokio::spawn(async move {
            let mut ticker = interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                "Reminder scheduler started (every {:?}, days before: {:?})",
                scheduler.interval,
                scheduler.policy.threshold_days()
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match scheduler.run_once().await {
                            Ok(report) => info!(
                                "Reminder run: {} events, {} due, {} sent, {} failed",
                                report.events_considered, report.due, report.sent, report.failed
                            ),
                            Err(e) => error!("Reminder run failed: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Reminder scheduler stopped");
        });

        SchedulerHandle { shutdown, task }
    }

    /// Evaluate the policy once at the clock's current time and send every
    /// due reminder.
    ///
    /// Only a failure to load events or guests fails the run; per-guest
    /// errors are counted in the report.
    pub async fn run_once(&self) -> Result<ReminderRunReport, RepositoryError> {
        let now = self.clock.now();
        let (after, until) = self.policy.window(now);

        let events = self.repo.list_events_between(after, until).await?;
        let mut batch = Vec::with_capacity(events.len());
        for event in events {
            let guests = self.repo.list_guests(event.id).await?;
            batch.push(EventWithGuests { event, guests });
        }

        let due = self.policy.compute_due_reminders(now, &batch);
        let mut report = ReminderRunReport {
            events_considered: batch.len(),
            due: due.len(),
            ..ReminderRunReport::default()
        };

        for reminder in &due {
            let guest = reminder.guest;
            let link = rsvp_link(&self.public_base_url, guest);
            let email = reminder_email(reminder.event, guest, &link);

            if let Err(e) = self
                .notifier
                .send(&guest.email, &email.subject, &email.html_body)
                .await
            {
                warn!(
                    "Failed to send reminder to guest {} for event {}: {}",
                    guest.id, reminder.event.id, e
                );
                report.failed += 1;
                continue;
            }

            match self.repo.record_reminder_sent(guest.id, now).await {
                Ok(_) => {
                    debug!(
                        "Reminded guest {} about event {} ({} days out)",
                        guest.id, reminder.event.id, reminder.days_until_event
                    );
                    report.sent += 1;
                }
                Err(e) => {
                    // The email went out; without the stamp the guest may be
                    // reminded again on the next run.
                    error!(
                        "Reminder sent to guest {} but not recorded: {}",
                        guest.id, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
