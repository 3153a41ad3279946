//! Bearer-token authentication for organizer routes.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use super::error::ApiError;
use crate::AppState;
use rsvp_core::{OrganizerContext, RsvpError};

/// The organizer a request acts for, resolved from `Authorization: Bearer`.
pub struct OrganizerAuth(pub OrganizerContext);

impl FromRequestParts<Arc<AppState>> for OrganizerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        match state.service.authenticate(token).await {
            Ok(ctx) => Ok(OrganizerAuth(ctx)),
            Err(RsvpError::Unauthorized(_)) => {
                Err(ApiError::Unauthenticated("Invalid token".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") && value.len() > 7 => Ok(&value[7..]),
        Some(_) => Err(ApiError::Unauthenticated(
            "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
        )),
        None => Err(ApiError::Unauthenticated(
            "Missing Authorization header. Expected: Bearer <token>".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc123")).unwrap(), "abc123");
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert!(bearer_token(&headers("Basic abc123")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }
}
