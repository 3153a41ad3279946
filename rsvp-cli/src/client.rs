//! Thin HTTP client for the organizer API.

use anyhow::{anyhow, Context, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct RsvpClient {
    http: reqwest::Client,
    server: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub api_token: String,
    pub organizer: Value,
}

#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub status: String,
    pub plus_one_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct Invitation {
    pub guest: Guest,
    pub rsvp_link: String,
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReminderReport {
    pub sent: usize,
    pub failed: usize,
}

impl RsvpClient {
    pub fn new(http: reqwest::Client, server: &str, token: Option<String>) -> Self {
        Self {
            http,
            server: server.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.token.as_deref().context(
            "An API token must be provided via --token argument or RSVP_TOKEN environment variable",
        )?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header("Authorization", format!("Bearer {}", token)))
    }

    pub async fn register(&self, name: &str, email: &str) -> Result<Registration> {
        let response = self
            .http
            .post(self.url("/organizers"))
            .json(&json!({ "name": name, "email": email }))
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    pub async fn create_event(&self, body: Value) -> Result<Event> {
        let response = self
            .request(Method::POST, "/events")?
            .json(&body)
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    pub async fn list_events(&self) -> Result<Vec<Event>> {
        let response = self
            .request(Method::GET, "/events")?
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    pub async fn invite(&self, event_id: i64, body: Value) -> Result<Invitation> {
        let response = self
            .request(Method::POST, &format!("/events/{}/guests", event_id))?
            .json(&body)
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    pub async fn list_guests(&self, event_id: i64) -> Result<Vec<Guest>> {
        let response = self
            .request(Method::GET, &format!("/events/{}/guests", event_id))?
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    /// Event analytics, or totals across all events when `event_id` is `None`.
    pub async fn analytics(&self, event_id: Option<i64>) -> Result<Value> {
        let path = match event_id {
            Some(id) => format!("/events/{}/analytics", id),
            None => "/analytics".to_string(),
        };
        let response = self
            .request(Method::GET, &path)?
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    pub async fn remind(&self, event_id: i64) -> Result<ReminderReport> {
        let response = self
            .request(Method::POST, &format!("/events/{}/guests/remind", event_id))?
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        parse(response).await
    }

    /// The CSV body and the server-suggested file name.
    pub async fn export(&self, event_id: i64) -> Result<(Vec<u8>, Option<String>)> {
        let response = self
            .request(Method::GET, &format!("/events/{}/guests/export", event_id))?
            .send()
            .await
            .context("Failed to send request to RSVP server")?;
        let response = check(response).await?;
        let filename = response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename);
        let body = response
            .bytes()
            .await
            .context("Failed to read CSV export")?;
        Ok((body.to_vec(), filename))
    }
}

async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .context("Failed to read error response")?;
    Err(anyhow!("RSVP server error: {} - {}", status, error_message(&error_text)))
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    check(response)
        .await?
        .json()
        .await
        .context("Failed to parse RSVP server response")
}

/// Pull the message out of a `{"error": "..."}` body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub fn attachment_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
