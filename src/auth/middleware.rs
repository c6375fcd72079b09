use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::server::AppState;

/// Extractor that requires a valid bearer access token.
pub struct RequireUser {
    pub user_id: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingAuth => "Authentication required",
            AuthError::InvalidScheme => "Invalid authorization scheme",
            AuthError::InvalidToken => "Could not validate credentials",
        };

        let body = json!({ "data": null, "error": message });
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Result<&str, AuthError> {
    let header = auth_header.ok_or(AuthError::MissingAuth)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingAuth);
    }
    Ok(token)
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = extract_bearer_token(auth_header)?;

        let claims = state
            .credentials
            .verify_access_token(token)
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(RequireUser {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(
            extract_bearer_token(None),
            Err(AuthError::MissingAuth)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Basic abc")),
            Err(AuthError::InvalidScheme)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer ")),
            Err(AuthError::MissingAuth)
        ));
    }

    #[test]
    fn test_rejection_sets_www_authenticate() {
        let response = AuthError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
    }
}
