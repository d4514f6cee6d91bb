//! Bearer-token authentication middleware
//!
//! Applied to the session routes only; `/api/health` stays public.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use rehearse_common::api::{codes, ErrorBody, BEARER_PREFIX};
use tracing::{debug, warn};

use super::verifier::VerifyError;
use crate::AppState;

/// Verify the request's bearer token and attach the [`super::VerifiedUser`]
///
/// Handlers read the user through the `Extension<VerifiedUser>` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedHeader)?;

    let user = state.verifier.verify(token).await.map_err(|e| match e {
        VerifyError::InvalidToken(reason) => {
            debug!("Token rejected: {}", reason);
            AuthError::InvalidToken
        }
        VerifyError::Unavailable(reason) => {
            warn!("Identity provider unavailable: {}", reason);
            AuthError::ProviderUnavailable
        }
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    MalformedHeader,
    InvalidToken,
    ProviderUnavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Missing Authorization header",
            ),
            AuthError::MalformedHeader => (
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Authorization header must be 'Bearer <token>'",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Invalid or expired token",
            ),
            AuthError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                codes::IDENTITY_UNAVAILABLE,
                "Identity provider is unavailable, try again later",
            ),
        };

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}
