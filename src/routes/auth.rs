//! Principal resolution and the `AuthUser` extractor.

use axum::extract::FromRef;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::error;

use super::error::ApiError;
use crate::access::Principal;
use crate::services::session;
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";

/// Session token from the `session_token` cookie or an `Authorization: Bearer` header.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) {
        return Some(token.to_owned());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(session::bearer_token)
        .map(str::to_owned)
}

/// Resolve the request's principal. `Ok(None)` means unauthenticated.
///
/// # Errors
///
/// Returns `Internal` if the session lookup fails.
pub(crate) async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    session::validate_session(&state.pool, &token).await.map_err(|e| {
        error!(error = %e, "session lookup failed");
        ApiError::Internal
    })
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated principal. Reuses the one a gate already resolved, otherwise
/// looks the session up. Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub principal: Principal,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(Self { principal: principal.clone() });
        }

        let app_state = AppState::from_ref(state);
        let principal = resolve_principal(&app_state, &parts.headers)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        parts.extensions.insert(principal.clone());
        Ok(Self { principal })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/auth/me`: return the current principal.
pub async fn me(auth: AuthUser) -> Json<Principal> {
    Json(auth.principal)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
