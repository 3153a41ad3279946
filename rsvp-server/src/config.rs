use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use rsvp_core::reminder::{DEFAULT_LOOKAHEAD_DAYS, DEFAULT_THRESHOLD_DAYS};
use rsvp_core::ReminderPolicy;

const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// SMTP settings. Present only when `SMTP_HOST` is set.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender mailbox, e.g. `RSVP Manager <rsvp@example.com>`.
    pub from: String,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Base URL guests use to reach the service; RSVP links are
    /// `{public_base_url}/rsvp/{token}`.
    pub public_base_url: String,
    pub reminder_interval: Duration,
    pub reminder_days_before: Vec<i64>,
    pub reminder_lookahead_days: i64,
    /// If unset, emails are logged instead of sent.
    pub smtp: Option<SmtpSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| parse_optional(lookup(key));

        let port = get("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = get("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let reminder_interval = match get("REMINDER_INTERVAL_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .context("REMINDER_INTERVAL_SECS must be a valid number")?;
                if secs == 0 {
                    bail!("REMINDER_INTERVAL_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REMINDER_INTERVAL_SECS),
        };

        let reminder_days_before = match get("REMINDER_DAYS_BEFORE") {
            Some(raw) => parse_reminder_days(&raw)?,
            None => DEFAULT_THRESHOLD_DAYS.to_vec(),
        };

        let reminder_lookahead_days = match get("REMINDER_LOOKAHEAD_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .context("REMINDER_LOOKAHEAD_DAYS must be a valid number")?,
            None => DEFAULT_LOOKAHEAD_DAYS,
        };

        let smtp = match get("SMTP_HOST") {
            Some(host) => {
                let port = get("SMTP_PORT")
                    .unwrap_or_else(|| "587".to_string())
                    .parse::<u16>()
                    .context("SMTP_PORT must be a valid number")?;
                let username = get("SMTP_USERNAME");
                let password = get("SMTP_PASSWORD");
                let from = match (get("MAIL_FROM"), &username) {
                    (Some(from), _) => from,
                    (None, Some(user)) => format!("RSVP Manager <{}>", user),
                    (None, None) => {
                        bail!("MAIL_FROM or SMTP_USERNAME is required when SMTP_HOST is set")
                    }
                };
                Some(SmtpSettings {
                    host,
                    port,
                    username,
                    password,
                    from,
                })
            }
            None => None,
        };

        let config = Config {
            port,
            state_dir,
            public_base_url,
            reminder_interval,
            reminder_days_before,
            reminder_lookahead_days,
            smtp,
        };
        // Surface policy mistakes at startup rather than on the first run.
        config.reminder_policy()?;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("rsvp.db")
    }

    pub fn reminder_policy(&self) -> Result<ReminderPolicy> {
        ReminderPolicy::new(
            self.reminder_days_before.clone(),
            self.reminder_lookahead_days,
        )
        .context("invalid reminder configuration")
    }
}

/// Treat missing, empty and whitespace-only values alike.
pub fn parse_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a comma-separated list of reminder days, e.g. `7,3,1`.
pub fn parse_reminder_days(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .with_context(|| format!("invalid reminder day '{}'", part))
        })
        .collect()
}
