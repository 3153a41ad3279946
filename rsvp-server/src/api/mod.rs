//! HTTP surface.
//!
//! Organizer routes authenticate with `Authorization: Bearer <api token>`
//! (see `auth`). Guest routes under `/rsvp/{token}` need no header; the
//! token is the credential. Errors are JSON `{"error": "..."}` bodies.

pub mod auth;
pub mod error;
pub mod events;
pub mod guests;
pub mod organizers;
pub mod rsvp;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};

use crate::AppState;

pub use error::{ApiError, ApiResult};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/help", get(help_handler))
        .route("/organizers", post(organizers::register))
        .route("/events", get(events::list).post(events::create))
        .route(
            "/events/{id}",
            get(events::show).put(events::update).delete(events::delete),
        )
        .route("/events/{id}/analytics", get(events::analytics))
        .route("/analytics", get(events::organizer_analytics))
        .route("/events/{id}/guests", get(guests::list).post(guests::invite))
        .route("/events/{id}/guests/remind", post(guests::remind))
        .route("/events/{id}/guests/export", get(guests::export))
        .route(
            "/events/{id}/guests/{guest_id}",
            put(guests::update).delete(guests::delete),
        )
        .route("/rsvp/{token}", get(rsvp::show).post(rsvp::submit))
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "rsvp-server",
        "version": state.version,
    }))
}

async fn help_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    let help = help_document(&state.version);
    if accept.to_lowercase().contains("text/html") {
        return Html(help_html(&help)).into_response();
    }
    Json(help).into_response()
}

const ENDPOINTS: &[(&str, &str, &str, &str)] = &[
    ("GET", "/health", "None", "Health check"),
    ("GET", "/help", "None", "This document (JSON or HTML)"),
    ("POST", "/organizers", "None", "Register an organizer; returns the API token"),
    ("GET", "/events", "Bearer", "List your events, soonest first"),
    ("POST", "/events", "Bearer", "Create an event"),
    ("GET", "/events/{id}", "Bearer", "Event with guests and head counts"),
    ("PUT", "/events/{id}", "Bearer", "Replace an event's details"),
    ("DELETE", "/events/{id}", "Bearer", "Delete an event and its guests"),
    ("GET", "/events/{id}/analytics", "Bearer", "Response rates and timeline"),
    ("GET", "/analytics", "Bearer", "Totals across all your events"),
    ("GET", "/events/{id}/guests", "Bearer", "List guests"),
    ("POST", "/events/{id}/guests", "Bearer", "Invite a guest by email"),
    ("PUT", "/events/{id}/guests/{guest_id}", "Bearer", "Edit a guest's contact details"),
    ("DELETE", "/events/{id}/guests/{guest_id}", "Bearer", "Remove a guest"),
    ("POST", "/events/{id}/guests/remind", "Bearer", "Remind all pending guests now"),
    ("GET", "/events/{id}/guests/export", "Bearer", "Guest list as CSV"),
    ("GET", "/rsvp/{token}", "RSVP token", "A guest's invitation"),
    ("POST", "/rsvp/{token}", "RSVP token", "Submit or change a response"),
];

fn help_document(version: &str) -> Value {
    let endpoints: Vec<Value> = ENDPOINTS
        .iter()
        .map(|(method, path, auth, description)| {
            json!({
                "method": method,
                "path": path,
                "authentication": auth,
                "description": description,
            })
        })
        .collect();

    json!({
        "service": "rsvp-server",
        "version": version,
        "description": "Event invitations, guest RSVPs and scheduled reminders",
        "endpoints": endpoints,
        "configuration": {
            "optional_env_vars": [
                "PORT (default: 3000)",
                "STATE_DIR (default: current directory)",
                "PUBLIC_BASE_URL (default: http://localhost:PORT)",
                "REMINDER_INTERVAL_SECS (default: 86400)",
                "REMINDER_DAYS_BEFORE (default: 7,3,1)",
                "REMINDER_LOOKAHEAD_DAYS (default: 7)",
                "SMTP_HOST, SMTP_PORT (default: 587), SMTP_USERNAME, SMTP_PASSWORD, MAIL_FROM"
            ]
        }
    })
}

fn help_html(help: &Value) -> String {
    let version = help["version"].as_str().unwrap_or_default();
    let mut html = format!(
        "<!DOCTYPE html>\n<html><head><title>RSVP server</title></head><body>\n\
         <h1>RSVP server</h1>\n<p>Version {}</p>\n<table>\n\
         <tr><th>Method</th><th>Path</th><th>Auth</th><th>Description</th></tr>\n",
        version
    );
    for (method, path, auth, description) in ENDPOINTS {
        html.push_str(&format!(
            "<tr><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td></tr>\n",
            method, path, auth, description
        ));
    }
    html.push_str("</table>\n</body></html>\n");
    html
}
