//! Axum extractors for the token bridge.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use sentinel_auth::{AuthState, EntraAuth};
//!
//! async fn protected(EntraAuth(session): EntraAuth) -> String {
//!     format!("Hello, {}!", session.user.username)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::authenticator::{AuthSession, EntraAuthenticator};
use crate::error::AuthError;

/// State required for bearer authentication, made available to the
/// extractors via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// The shared authenticator.
    pub authenticator: Arc<EntraAuthenticator>,
}

impl AuthState {
    /// Creates auth state around a shared authenticator.
    #[must_use]
    pub fn new(authenticator: Arc<EntraAuthenticator>) -> Self {
        Self { authenticator }
    }
}

/// Extractor that requires a valid Entra bearer token.
///
/// A request without a bearer credential is rejected with 401 here; routes
/// that want to fall through to other schemes use [`OptionalEntraAuth`].
pub struct EntraAuth(pub AuthSession);

impl<S> FromRequestParts<S> for EntraAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_state.authenticator.authenticate(authorization).await? {
            Some(session) => Ok(EntraAuth(session)),
            None => Err(AuthError::unauthorized("No credentials supplied")),
        }
    }
}

/// Extractor that authenticates when a bearer credential is present and
/// yields `None` when it is not. Real failures still reject.
pub struct OptionalEntraAuth(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for OptionalEntraAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let session = auth_state.authenticator.authenticate(authorization).await?;
        Ok(OptionalEntraAuth(session))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = self.to_string();

        let body = json!({
            "error": "authentication_failed",
            "error_description": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(&message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// HTTP status for a failure.
///
/// Key-fetch, parse, and storage problems are deliberately downgraded to
/// 401: an unverifiable token is an authentication failure, never a server
/// error the caller can retry into. Only misconfiguration renders 500, and
/// that is already caught at construction.
fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    }
}

/// Builds the `WWW-Authenticate` header value for 401 responses.
fn build_www_authenticate_header(description: &str) -> String {
    let escaped = description.replace('"', "\\\"");
    format!("Bearer realm=\"sentinel\", error=\"invalid_token\", error_description=\"{escaped}\"")
}
