//! Outgoing email.
//!
//! `Notifier` is the single seam between the service and mail delivery.
//! The SMTP implementation is used when SMTP is configured; otherwise
//! emails are only logged.

mod smtp;
pub mod templates;

pub use smtp::SmtpNotifier;
pub use templates::EmailContent;

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError>;
}

/// Logs every email instead of delivering it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError> {
        info!(
            "SMTP not configured, would send '{}' to {} ({} bytes)",
            subject,
            recipient,
            html_body.len()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Records emails in memory. Recipients registered with `fail_for` get a
/// transport error instead.
#[derive(Debug, Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl CapturingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(recipient.to_string());
        }
    }

    pub fn recover(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(recipient);
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<SentEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.recipient == recipient)
            .collect()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError> {
        let should_fail = self
            .failing
            .lock()
            .map(|failing| failing.contains(recipient))
            .unwrap_or(false);
        if should_fail {
            return Err(DeliveryError::Transport(format!(
                "simulated failure for {}",
                recipient
            )));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DeliveryError::Transport("capture lock poisoned".to_string()))?;
        sent.push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}
