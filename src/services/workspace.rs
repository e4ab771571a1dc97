//! Workspace service: per-owner note and event panels.
//!
//! DESIGN
//! ======
//! A workspace is hydrated from Postgres the first time its owner touches it
//! and then served from memory. Mutations go through the owner's
//! `EntityPanel` and record the id in the matching `PendingWrites` so the
//! persistence task can upsert or delete it later. Nothing here waits on
//! Postgres except hydration.
//!
//! Operations are generic over `WorkspaceEntity`, which tells them which
//! panel and which write set inside `WorkspaceState` belong to an entity type.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::panel::{Entity, EntityPanel, Event, EventType, Note, PanelError, Query, ValidationError};
use crate::state::{AppState, PendingWrites, WorkspaceState, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: ValidationError },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// An entity type stored in a workspace.
pub trait WorkspaceEntity: Entity {
    fn panel(ws: &WorkspaceState) -> &EntityPanel<Self>;
    fn slot(ws: &mut WorkspaceState) -> (&mut EntityPanel<Self>, &mut PendingWrites);
}

impl WorkspaceEntity for Note {
    fn panel(ws: &WorkspaceState) -> &EntityPanel<Self> {
        &ws.notes
    }

    fn slot(ws: &mut WorkspaceState) -> (&mut EntityPanel<Self>, &mut PendingWrites) {
        (&mut ws.notes, &mut ws.note_writes)
    }
}

impl WorkspaceEntity for Event {
    fn panel(ws: &WorkspaceState) -> &EntityPanel<Self> {
        &ws.events
    }

    fn slot(ws: &mut WorkspaceState) -> (&mut EntityPanel<Self>, &mut PendingWrites) {
        (&mut ws.events, &mut ws.event_writes)
    }
}

// =============================================================================
// OPEN / HYDRATE
// =============================================================================

/// Make sure the owner's workspace is in memory, loading it if needed.
/// Marks the workspace as recently used.
///
/// # Errors
///
/// Returns `Database` if hydration fails.
pub async fn open_workspace(state: &AppState, owner: Uuid) -> Result<(), WorkspaceError> {
    if let Some(ws) = state.workspaces.read().await.get(&owner) {
        ws.touch();
        return Ok(());
    }

    // Hydrate without holding the lock; a concurrent open may win the insert.
    let hydrated = hydrate_workspace(&state.pool, owner).await?;
    let mut workspaces = state.workspaces.write().await;
    workspaces
        .entry(owner)
        .or_insert_with(|| {
            info!(%owner, notes = hydrated.notes.len(), events = hydrated.events.len(), "hydrated workspace from database");
            hydrated
        })
        .touch();
    Ok(())
}

/// Run `f` against the owner's workspace under the read lock.
async fn read_workspace<T>(
    state: &AppState,
    owner: Uuid,
    f: impl FnOnce(&WorkspaceState) -> T,
) -> Result<T, WorkspaceError> {
    loop {
        open_workspace(state, owner).await?;
        let workspaces = state.workspaces.read().await;
        if let Some(ws) = workspaces.get(&owner) {
            return Ok(f(ws));
        }
        // Evicted between open and lock; hydrate again.
    }
}

/// Run `f` against the owner's workspace under the write lock.
async fn write_workspace<T>(
    state: &AppState,
    owner: Uuid,
    f: impl FnOnce(&mut WorkspaceState) -> T,
) -> Result<T, WorkspaceError> {
    loop {
        open_workspace(state, owner).await?;
        let mut workspaces = state.workspaces.write().await;
        if let Some(ws) = workspaces.get_mut(&owner) {
            return Ok(f(ws));
        }
    }
}

async fn hydrate_workspace(pool: &PgPool, owner: Uuid) -> Result<WorkspaceState, sqlx::Error> {
    let mut ws = WorkspaceState::new();

    let note_rows = sqlx::query(
        "SELECT id, title, content, tags, pinned, created_at, updated_at FROM notes WHERE owner_id = $1",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;
    for row in note_rows {
        ws.notes.insert_loaded(Note {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            tags: row.get("tags"),
            pinned: row.get("pinned"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        });
    }

    let event_rows = sqlx::query(
        "SELECT id, title, event_date, event_time, event_type, description, created_at, updated_at \
         FROM events WHERE owner_id = $1",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;
    for row in event_rows {
        let event_type: String = row.get("event_type");
        ws.events.insert_loaded(Event {
            id: row.get("id"),
            title: row.get("title"),
            date: row.get("event_date"),
            time: row.get("event_time"),
            event_type: EventType::from_str(&event_type).unwrap_or_default(),
            description: row.get("description"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        });
    }

    Ok(ws)
}

// =============================================================================
// CRUD
// =============================================================================

/// Filtered, presentation-ordered view of one entity type.
///
/// # Errors
///
/// Returns `Database` if the workspace has to be hydrated and that fails.
pub async fn query<E: WorkspaceEntity>(state: &AppState, owner: Uuid, query: &Query) -> Result<Vec<E>, WorkspaceError> {
    read_workspace(state, owner, |ws| E::panel(ws).query(query)).await
}

/// Classifications present in one entity type.
///
/// # Errors
///
/// Returns `Database` if hydration fails.
pub async fn distinct_tags<E: WorkspaceEntity>(state: &AppState, owner: Uuid) -> Result<BTreeSet<String>, WorkspaceError> {
    read_workspace(state, owner, |ws| E::panel(ws).distinct_tags()).await
}

/// Validate and create an entity.
///
/// # Errors
///
/// Returns `Invalid` with the missing field; nothing is created.
pub async fn create<E: WorkspaceEntity>(state: &AppState, owner: Uuid, draft: E::Draft) -> Result<E, WorkspaceError> {
    // Reject before hydrating.
    E::validate(&draft).map_err(|reason| WorkspaceError::Invalid { kind: E::KIND, reason })?;

    write_workspace(state, owner, |ws| {
        let (panel, writes) = E::slot(ws);
        let created = panel
            .create_checked(draft)
            .map_err(|reason| WorkspaceError::Invalid { kind: E::KIND, reason })?;
        writes.mark_dirty(created.id());
        Ok(created)
    })
    .await?
}

/// Merge a patch into an existing entity.
///
/// # Errors
///
/// Returns `NotFound` if the owner has no such entity, or `Invalid` if the
/// patch would clear a required field. The entity is unchanged on error.
pub async fn update<E: WorkspaceEntity>(
    state: &AppState,
    owner: Uuid,
    id: Uuid,
    patch: E::Patch,
) -> Result<E, WorkspaceError> {
    write_workspace(state, owner, |ws| {
        let (panel, writes) = E::slot(ws);
        let updated = panel.update(id, patch).map_err(|e| match e {
            PanelError::NotFound(id) => WorkspaceError::NotFound { kind: E::KIND, id },
            PanelError::Invalid(reason) => WorkspaceError::Invalid { kind: E::KIND, reason },
        })?;
        writes.mark_dirty(id);
        Ok(updated)
    })
    .await?
}

/// Delete an entity. Deleting an absent id succeeds and changes nothing.
///
/// # Errors
///
/// Returns `Database` if hydration fails.
pub async fn delete<E: WorkspaceEntity>(state: &AppState, owner: Uuid, id: Uuid) -> Result<(), WorkspaceError> {
    write_workspace(state, owner, |ws| {
        let (panel, writes) = E::slot(ws);
        if panel.delete(id).is_some() {
            writes.mark_removed(id);
        }
    })
    .await
}

/// Full workspace contents in presentation order, for export.
///
/// # Errors
///
/// Returns `Database` if hydration fails.
pub async fn snapshot(state: &AppState, owner: Uuid) -> Result<(Vec<Note>, Vec<Event>), WorkspaceError> {
    let all = Query::default();
    read_workspace(state, owner, |ws| (ws.notes.query(&all), ws.events.query(&all))).await
}

// =============================================================================
// EVICTION
// =============================================================================

/// Drop workspaces that have nothing pending and have been idle for at least
/// `idle_ttl`. Returns the evicted owners.
pub async fn evict_idle_workspaces(state: &AppState, idle_ttl: Duration) -> Vec<Uuid> {
    let mut workspaces = state.workspaces.write().await;
    evict_idle(&mut workspaces, idle_ttl, now_ms())
}

pub(crate) fn evict_idle(workspaces: &mut HashMap<Uuid, WorkspaceState>, idle_ttl: Duration, now_ms: i64) -> Vec<Uuid> {
    let ttl_ms = i64::try_from(idle_ttl.as_millis()).unwrap_or(i64::MAX);
    let idle = workspaces
        .iter()
        .filter(|(_, ws)| !ws.has_pending_writes() && ws.idle_ms(now_ms) >= ttl_ms)
        .map(|(owner, _)| *owner)
        .collect::<Vec<_>>();
    for owner in &idle {
        workspaces.remove(owner);
        info!(%owner, "evicted idle workspace from memory");
    }
    idle
}

// =============================================================================
// FLUSH
// =============================================================================

/// Writes collected from one workspace by the persistence task.
#[derive(Debug, Default)]
pub struct WorkspaceFlush {
    pub notes: Vec<Note>,
    pub removed_notes: Vec<Uuid>,
    pub events: Vec<Event>,
    pub removed_events: Vec<Uuid>,
}

impl WorkspaceFlush {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.removed_notes.is_empty() && self.events.is_empty() && self.removed_events.is_empty()
    }
}

/// Apply one workspace's pending writes in a single transaction.
///
/// # Errors
///
/// Returns the first database error; the transaction is rolled back.
pub async fn flush_workspace(pool: &PgPool, owner: Uuid, flush: &WorkspaceFlush) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for note in &flush.notes {
        upsert_note(&mut tx, owner, note).await?;
    }
    for event in &flush.events {
        upsert_event(&mut tx, owner, event).await?;
    }
    if !flush.removed_notes.is_empty() {
        sqlx::query("DELETE FROM notes WHERE owner_id = $1 AND id = ANY($2)")
            .bind(owner)
            .bind(&flush.removed_notes)
            .execute(tx.as_mut())
            .await?;
    }
    if !flush.removed_events.is_empty() {
        sqlx::query("DELETE FROM events WHERE owner_id = $1 AND id = ANY($2)")
            .bind(owner)
            .bind(&flush.removed_events)
            .execute(tx.as_mut())
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn upsert_note(tx: &mut Transaction<'_, Postgres>, owner: Uuid, note: &Note) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notes (id, owner_id, title, content, tags, pinned, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (id) DO UPDATE SET \
         title = EXCLUDED.title, content = EXCLUDED.content, tags = EXCLUDED.tags, \
         pinned = EXCLUDED.pinned, updated_at = EXCLUDED.updated_at",
    )
    .bind(note.id)
    .bind(owner)
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.tags)
    .bind(note.pinned)
    .bind(note.created_at)
    .bind(note.updated_at)
    .execute(tx.as_mut())
    .await?;
    Ok(())
}

async fn upsert_event(tx: &mut Transaction<'_, Postgres>, owner: Uuid, event: &Event) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO events (id, owner_id, title, event_date, event_time, event_type, description, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (id) DO UPDATE SET \
         title = EXCLUDED.title, event_date = EXCLUDED.event_date, event_time = EXCLUDED.event_time, \
         event_type = EXCLUDED.event_type, description = EXCLUDED.description, updated_at = EXCLUDED.updated_at",
    )
    .bind(event.id)
    .bind(owner)
    .bind(&event.title)
    .bind(event.date)
    .bind(event.time)
    .bind(event.event_type.as_str())
    .bind(&event.description)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(tx.as_mut())
    .await?;
    Ok(())
}

/// `updated_at` per flushed id, used to decide which dirty flags to clear.
pub(crate) fn flushed_stamps<E: Entity>(entities: &[E]) -> HashMap<Uuid, chrono::DateTime<chrono::Utc>> {
    entities.iter().map(|e| (e.id(), e.updated_at())).collect()
}

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;
