use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::OrganizerAuth;
use super::error::ApiResult;
use crate::AppState;
use rsvp_core::{
    parse_event_date, CustomFields, Event, EventAnalytics, EventDraft, EventId, Guest,
    OrganizerAnalytics, RsvpResult, RsvpStats,
};

/// Request body for creating or replacing an event.
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// RFC 3339, or `YYYY-MM-DDTHH:MM` read as UTC.
    pub date: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub custom_fields: CustomFields,
}

impl EventPayload {
    fn into_draft(self) -> RsvpResult<EventDraft> {
        Ok(EventDraft {
            title: self.title,
            description: self.description,
            date: parse_event_date(&self.date)?,
            location: self.location,
            custom_fields: self.custom_fields,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub stats: RsvpStats,
    pub guests: Vec<Guest>,
}

/// Handler: GET /events
pub async fn list(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.service.list_events(&ctx).await?))
}

/// Handler: POST /events
pub async fn create(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let Json(payload) = payload?;
    let event = state
        .service
        .create_event(&ctx, payload.into_draft()?)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Handler: GET /events/{id}
///
/// The event with its guest list and head counts.
pub async fn show(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Json<EventDetail>> {
    let Path(id) = id?;
    let event = state.service.get_event(&ctx, id).await?;
    let guests = state.service.list_guests(&ctx, id).await?;
    Ok(Json(EventDetail {
        event,
        stats: RsvpStats::from_guests(&guests),
        guests,
    }))
}

/// Handler: PUT /events/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> ApiResult<Json<Event>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let event = state
        .service
        .update_event(&ctx, id, payload.into_draft()?)
        .await?;
    Ok(Json(event))
}

/// Handler: DELETE /events/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.service.delete_event(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: GET /events/{id}/analytics
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Json<EventAnalytics>> {
    let Path(id) = id?;
    Ok(Json(state.service.event_analytics(&ctx, id).await?))
}

/// Handler: GET /analytics
pub async fn organizer_analytics(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
) -> ApiResult<Json<OrganizerAnalytics>> {
    Ok(Json(state.service.organizer_analytics(&ctx).await?))
}
