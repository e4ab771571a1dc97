//! Plan gate middleware.
//!
//! SYSTEM CONTEXT
//! ==============
//! Layered onto route groups with `from_fn_with_state`. The gate resolves the
//! principal, asks `access` for a decision, and either forwards the request
//! (with the `Principal` stored in request extensions for `AuthUser`) or
//! answers 401/403 with a JSON message.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::auth::resolve_principal;
use super::error::ApiError;
use crate::access::{self, Decision, PlanSet, Principal};
use crate::state::AppState;

/// Middleware state for `require_plan`.
#[derive(Clone)]
pub struct PlanGate {
    pub app: AppState,
    pub allowed: PlanSet,
}

impl PlanGate {
    #[must_use]
    pub fn new(app: AppState, allowed: PlanSet) -> Self {
        Self { app, allowed }
    }
}

/// Admit principals whose plan is in the gate's set.
pub async fn require_plan(State(gate): State<PlanGate>, req: Request, next: Next) -> Response {
    let allowed = gate.allowed;
    run_gate(&gate.app, req, next, |principal| access::authorize(principal, allowed)).await
}

/// Admit premium principals only.
pub async fn require_premium(State(app): State<AppState>, req: Request, next: Next) -> Response {
    run_gate(&app, req, next, access::require_premium).await
}

async fn run_gate(
    app: &AppState,
    mut req: Request,
    next: Next,
    decide: impl FnOnce(Option<&Principal>) -> Decision,
) -> Response {
    let principal = match req.extensions().get::<Principal>().cloned() {
        Some(principal) => Some(principal),
        None => match resolve_principal(app, req.headers()).await {
            Ok(principal) => principal,
            Err(e) => return e.into_response(),
        },
    };

    match decide(principal.as_ref()) {
        Decision::Allow => {
            if let Some(principal) = principal {
                req.extensions_mut().insert(principal);
            }
            next.run(req).await
        }
        Decision::Unauthorized => {
            debug!(path = %req.uri().path(), "unauthenticated request rejected");
            ApiError::Unauthorized.into_response()
        }
        Decision::Forbidden { message } => {
            debug!(path = %req.uri().path(), %message, "plan gate denied request");
            ApiError::Forbidden(message).into_response()
        }
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
