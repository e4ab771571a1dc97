//! Note and event CRUD routes.
//!
//! One set of generic handlers serves both panels; the router instantiates
//! them with `Note` or `Event`. Plan gating happens in the route layer, so
//! handlers only need the authenticated owner.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{ApiError, workspace_error_to_api};
use crate::panel::{self, ViewMode};
use crate::services::workspace::{self, WorkspaceEntity};
use crate::state::AppState;

/// Query string for list endpoints. Notes filter on `tag`, events on `type`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub q: String,
    #[serde(default, alias = "type")]
    pub tag: Option<String>,
    #[serde(default)]
    pub view: ViewMode,
}

impl ListParams {
    fn into_query(self) -> panel::Query {
        let mut query = panel::Query::text(self.q).view(self.view);
        if let Some(tag) = self.tag.filter(|t| !t.trim().is_empty()) {
            query = query.classification(tag);
        }
        query
    }
}

/// `GET /api/{notes,events}`: filtered list in presentation order.
pub async fn list<E>(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<E>>, ApiError>
where
    E: WorkspaceEntity + Serialize + Send + Sync + 'static,
{
    let query = params.into_query();
    let items = workspace::query::<E>(&state, auth.principal.id, &query)
        .await
        .map_err(workspace_error_to_api)?;
    Ok(Json(items))
}

/// `POST /api/{notes,events}`: create from a draft.
pub async fn create<E>(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(draft): Json<E::Draft>,
) -> Result<(StatusCode, Json<E>), ApiError>
where
    E: WorkspaceEntity + Serialize + Send + Sync + 'static,
    E::Draft: DeserializeOwned + Send + 'static,
{
    let created = workspace::create::<E>(&state, auth.principal.id, draft)
        .await
        .map_err(workspace_error_to_api)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /api/{notes,events}/{id}`: merge a partial update.
pub async fn update<E>(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<E::Patch>,
) -> Result<Json<E>, ApiError>
where
    E: WorkspaceEntity + Serialize + Send + Sync + 'static,
    E::Patch: DeserializeOwned + Send + 'static,
{
    let updated = workspace::update::<E>(&state, auth.principal.id, id, patch)
        .await
        .map_err(workspace_error_to_api)?;
    Ok(Json(updated))
}

/// `DELETE /api/{notes,events}/{id}`: always 204, present or not.
pub async fn remove<E>(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError>
where
    E: WorkspaceEntity + Send + Sync + 'static,
{
    workspace::delete::<E>(&state, auth.principal.id, id)
        .await
        .map_err(workspace_error_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/notes/tags` and `GET /api/events/types`.
pub async fn tags<E>(State(state): State<AppState>, auth: AuthUser) -> Result<Json<BTreeSet<String>>, ApiError>
where
    E: WorkspaceEntity + Send + Sync + 'static,
{
    let tags = workspace::distinct_tags::<E>(&state, auth.principal.id)
        .await
        .map_err(workspace_error_to_api)?;
    Ok(Json(tags))
}

#[cfg(test)]
#[path = "entities_test.rs"]
mod tests;
