//! Workspace export as NDJSON.
//!
//! Line 1 is a `workspace_export_meta` record. Every following line is one
//! note or event tagged with `type`, notes first, each group in presentation
//! order.

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{ApiError, workspace_error_to_api};
use crate::panel::{Event, Note};
use crate::services::workspace;
use crate::state::AppState;

const EXPORT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ExportMetaLine {
    #[serde(rename = "type")]
    line_type: &'static str,
    version: u32,
    owner_id: Uuid,
    exported_at: DateTime<Utc>,
    note_count: usize,
    event_count: usize,
}

#[derive(Serialize)]
struct ExportEntityLine<'a, E> {
    #[serde(rename = "type")]
    line_type: &'static str,
    #[serde(flatten)]
    entity: &'a E,
}

/// Render the export body. Each returned string is one newline-terminated line.
pub(crate) fn export_lines(owner_id: Uuid, notes: &[Note], events: &[Event]) -> Result<Vec<String>, serde_json::Error> {
    let mut lines = Vec::with_capacity(notes.len() + events.len() + 1);
    let meta = ExportMetaLine {
        line_type: "workspace_export_meta",
        version: EXPORT_VERSION,
        owner_id,
        exported_at: Utc::now(),
        note_count: notes.len(),
        event_count: events.len(),
    };
    lines.push(format!("{}\n", serde_json::to_string(&meta)?));

    for note in notes {
        let line = ExportEntityLine { line_type: "note", entity: note };
        lines.push(format!("{}\n", serde_json::to_string(&line)?));
    }
    for event in events {
        let line = ExportEntityLine { line_type: "event", entity: event };
        lines.push(format!("{}\n", serde_json::to_string(&line)?));
    }
    Ok(lines)
}

/// `GET /api/export.jsonl`: stream the caller's workspace.
pub async fn export_jsonl(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let owner_id = auth.principal.id;
    let (notes, events) = workspace::snapshot(&state, owner_id)
        .await
        .map_err(workspace_error_to_api)?;

    let lines = export_lines(owner_id, &notes, &events).map_err(|e| {
        error!(error = %e, "export serialization failed");
        ApiError::Internal
    })?;
    info!(%owner_id, notes = notes.len(), events = events.len(), "exported workspace");

    let stream = futures::stream::iter(
        lines
            .into_iter()
            .map(|line| Ok::<axum::body::Bytes, std::convert::Infallible>(axum::body::Bytes::from(line))),
    );
    let body = axum::body::Body::from_stream(stream);
    let filename = format!("workspace-{owner_id}.jsonl");

    Ok((
        [
            (CONTENT_TYPE, "application/x-ndjson; charset=utf-8"),
            (CONTENT_DISPOSITION, &format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
