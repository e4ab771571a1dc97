//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Gated panels are their own route groups with a plan gate applied as a
//! route layer, so unmatched paths still 404 instead of 401. Notes only need
//! a session (`AuthUser`), events need premium or enterprise, export needs
//! premium.

pub mod auth;
pub mod entities;
pub mod error;
pub mod export;
pub mod gate;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::access::{Plan, PlanSet};
use crate::panel::{Event, Note};
use crate::state::AppState;
use gate::PlanGate;

/// Plans admitted to the events panel.
#[must_use]
pub fn event_plans() -> PlanSet {
    [Plan::Premium, Plan::Enterprise].into_iter().collect()
}

fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notes", get(entities::list::<Note>).post(entities::create::<Note>))
        .route("/api/notes/tags", get(entities::tags::<Note>))
        .route("/api/notes/{id}", patch(entities::update::<Note>).delete(entities::remove::<Note>))
}

fn event_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/events", get(entities::list::<Event>).post(entities::create::<Event>))
        .route("/api/events/types", get(entities::tags::<Event>))
        .route("/api/events/{id}", patch(entities::update::<Event>).delete(entities::remove::<Event>))
        .route_layer(from_fn_with_state(PlanGate::new(state.clone(), event_plans()), gate::require_plan))
}

fn export_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/export.jsonl", get(export::export_jsonl))
        .route_layer(from_fn_with_state(state.clone(), gate::require_premium))
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/me", get(auth::me))
        .merge(note_routes())
        .merge(event_routes(&state))
        .merge(export_routes(&state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
