use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use rsvp_core::RsvpError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rsvp(#[from] RsvpError),

    /// Missing, malformed or unknown bearer token.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("malformed request: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rsvp(e) => match e {
                RsvpError::NotFound(_) => StatusCode::NOT_FOUND,
                RsvpError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                RsvpError::Unauthorized(_) => StatusCode::FORBIDDEN,
                RsvpError::Conflict(_) => StatusCode::CONFLICT,
                RsvpError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));
        match self {
            ApiError::Unauthenticated(_) => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RsvpError::not_found("guest"), StatusCode::NOT_FOUND),
            (RsvpError::invalid("status"), StatusCode::BAD_REQUEST),
            (RsvpError::unauthorized("not yours"), StatusCode::FORBIDDEN),
            (RsvpError::Conflict("email".to_string()), StatusCode::CONFLICT),
            (
                RsvpError::Persistence("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(
            ApiError::Unauthenticated("missing token".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_unauthenticated_sets_challenge_header() {
        let response = ApiError::Unauthenticated("missing token".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
