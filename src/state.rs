//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool and a map of live workspaces keyed by owner.
//! Each workspace has its own note and event panels plus the dirty and
//! removed sets the persistence task drains. A workspace with nothing pending
//! that has not been touched for the idle TTL is evicted and hydrated again
//! on its next use.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::panel::{EntityPanel, Event, Note};

// =============================================================================
// WORKSPACE STATE
// =============================================================================

/// Pending writes for one entity table.
#[derive(Debug, Default)]
pub struct PendingWrites {
    /// Ids created or updated since the last flush.
    pub dirty: HashSet<Uuid>,
    /// Ids deleted since the last flush.
    pub removed: HashSet<Uuid>,
}

impl PendingWrites {
    pub fn mark_dirty(&mut self, id: Uuid) {
        self.removed.remove(&id);
        self.dirty.insert(id);
    }

    pub fn mark_removed(&mut self, id: Uuid) {
        self.dirty.remove(&id);
        self.removed.insert(id);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty() && self.removed.is_empty()
    }
}

/// Per-owner live state. Hydrated from Postgres on first access and flushed
/// back by the persistence task.
#[derive(Debug)]
pub struct WorkspaceState {
    pub notes: EntityPanel<Note>,
    pub events: EntityPanel<Event>,
    pub note_writes: PendingWrites,
    pub event_writes: PendingWrites,
    /// Unix millis of the last request that used this workspace. Atomic so
    /// readers holding only the map's read lock can refresh it.
    last_access_ms: AtomicI64,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self {
            notes: EntityPanel::new(),
            events: EntityPanel::new(),
            note_writes: PendingWrites::default(),
            event_writes: PendingWrites::default(),
            last_access_ms: AtomicI64::new(now_ms()),
        }
    }
}

impl WorkspaceState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        !self.note_writes.is_empty() || !self.event_writes.is_empty()
    }

    pub fn touch(&self) {
        self.last_access_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Milliseconds since the last `touch` (or creation), as of `now_ms`.
    #[must_use]
    pub fn idle_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.last_access_ms.load(Ordering::Relaxed))
    }
}

/// Wall clock as Unix milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub workspaces: Arc<RwLock<HashMap<Uuid, WorkspaceState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool, workspaces: Arc::new(RwLock::new(HashMap::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
