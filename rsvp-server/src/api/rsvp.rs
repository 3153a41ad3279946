//! Guest-facing routes. The token in the path is the only credential.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;

use super::error::ApiResult;
use crate::service::RsvpView;
use crate::AppState;
use rsvp_core::Guest;

#[derive(Debug, Deserialize)]
pub struct RsvpPayload {
    pub status: String,
    #[serde(default)]
    pub plus_one_count: Option<i64>,
    #[serde(default)]
    pub responses: Option<serde_json::Value>,
}

/// Handler: GET /rsvp/{token}
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult<Json<RsvpView>> {
    Ok(Json(state.service.get_rsvp(&token).await?))
}

/// Handler: POST /rsvp/{token}
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    payload: Result<Json<RsvpPayload>, JsonRejection>,
) -> ApiResult<Json<Guest>> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            // Unknown links are 404 even when the body is also unreadable.
            state.service.find_guest_by_token(&token).await?;
            return Err(rejection.into());
        }
    };
    let updated = state
        .service
        .submit_response(
            &token,
            &payload.status,
            payload.plus_one_count,
            payload.responses,
        )
        .await?;
    Ok(Json(updated))
}
