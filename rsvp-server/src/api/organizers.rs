use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use super::error::ApiResult;
use crate::service::Registration;
use crate::AppState;
use rsvp_core::NewOrganizer;

/// Handler: POST /organizers
///
/// The response carries the organizer's API token. It is not stored in
/// plain form and cannot be retrieved again.
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewOrganizer>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let Json(organizer) = payload?;
    let registration = state.service.register_organizer(organizer).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}
