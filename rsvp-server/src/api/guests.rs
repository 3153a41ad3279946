use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::auth::OrganizerAuth;
use super::error::ApiResult;
use crate::service::{BulkReminderReport, Invitation};
use crate::AppState;
use rsvp_core::{EventId, Guest, GuestDetails, GuestId};

/// Handler: GET /events/{id}/guests
pub async fn list(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Json<Vec<Guest>>> {
    let Path(event_id) = id?;
    Ok(Json(state.service.list_guests(&ctx, event_id).await?))
}

/// Handler: POST /events/{id}/guests
///
/// Creates the guest and emails the invitation. An email failure is
/// reported in `email_sent` rather than as an error.
pub async fn invite(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
    payload: Result<Json<GuestDetails>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    let Path(event_id) = id?;
    let Json(details) = payload?;
    let invitation = state.service.invite_guest(&ctx, event_id, details).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Handler: PUT /events/{id}/guests/{guest_id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    ids: Result<Path<(EventId, GuestId)>, PathRejection>,
    payload: Result<Json<GuestDetails>, JsonRejection>,
) -> ApiResult<Json<Guest>> {
    let Path((event_id, guest_id)) = ids?;
    let Json(details) = payload?;
    let guest = state
        .service
        .update_guest(&ctx, event_id, guest_id, details)
        .await?;
    Ok(Json(guest))
}

/// Handler: DELETE /events/{id}/guests/{guest_id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    ids: Result<Path<(EventId, GuestId)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((event_id, guest_id)) = ids?;
    state.service.delete_guest(&ctx, event_id, guest_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: POST /events/{id}/guests/remind
pub async fn remind(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Json<BulkReminderReport>> {
    let Path(event_id) = id?;
    Ok(Json(state.service.send_bulk_reminders(&ctx, event_id).await?))
}

/// Handler: GET /events/{id}/guests/export
pub async fn export(
    State(state): State<Arc<AppState>>,
    OrganizerAuth(ctx): OrganizerAuth,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(event_id) = id?;
    let export = state.service.export_guests_csv(&ctx, event_id).await?;
    let disposition = format!("attachment; filename={}", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}
