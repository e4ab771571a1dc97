//! Persistence service: background flush for dirty workspace entities.
//!
//! DESIGN
//! ======
//! A background task snapshots pending writes from every workspace, writes
//! each workspace in one transaction, then sleeps for the configured interval
//! before the next cycle. Request handlers never wait on Postgres for writes.
//! After each flush, workspaces with nothing pending that have been idle past
//! the configured TTL are dropped from memory.
//!
//! ERROR HANDLING
//! ==============
//! Pending flags are cleared only after a successful commit. A failed
//! workspace keeps its flags and is retried next cycle: repeated upserts are
//! acceptable, silent data loss is not.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::panel::Entity;
use crate::services::workspace::{self, WorkspaceFlush};
use crate::state::{AppState, PendingWrites, WorkspaceState};

/// Spawn the background persistence task. Each cycle flushes pending writes,
/// then evicts workspaces idle for `idle_ttl`. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState, interval: Duration, idle_ttl: Duration) -> JoinHandle<()> {
    let flush_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    let idle_ttl_ms = u64::try_from(idle_ttl.as_millis()).unwrap_or(u64::MAX);
    info!(flush_interval_ms, idle_ttl_ms, "entity persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_pending(&state).await;
            // Flushed workspaces are clean now and become evictable.
            workspace::evict_idle_workspaces(&state, idle_ttl).await;
            tokio::time::sleep(interval).await;
        }
    })
}

/// Snapshot of one workspace's pending writes plus the stamps needed to ack them.
#[derive(Debug)]
struct FlushBatch {
    owner: Uuid,
    flush: WorkspaceFlush,
    note_stamps: HashMap<Uuid, DateTime<Utc>>,
    event_stamps: HashMap<Uuid, DateTime<Utc>>,
}

fn collect_batch(owner: Uuid, ws: &WorkspaceState) -> Option<FlushBatch> {
    if !ws.has_pending_writes() {
        return None;
    }

    let flush = WorkspaceFlush {
        notes: ws
            .note_writes
            .dirty
            .iter()
            .filter_map(|id| ws.notes.get(*id).cloned())
            .collect(),
        removed_notes: ws.note_writes.removed.iter().copied().collect(),
        events: ws
            .event_writes
            .dirty
            .iter()
            .filter_map(|id| ws.events.get(*id).cloned())
            .collect(),
        removed_events: ws.event_writes.removed.iter().copied().collect(),
    };
    if flush.is_empty() {
        return None;
    }

    Some(FlushBatch {
        owner,
        note_stamps: workspace::flushed_stamps(&flush.notes),
        event_stamps: workspace::flushed_stamps(&flush.events),
        flush,
    })
}

pub(crate) async fn flush_all_pending(state: &AppState) {
    // PHASE: SNAPSHOT PENDING WRITES
    // WHY: collect clones under lock, then perform I/O lock-free.
    let batches = {
        let workspaces = state.workspaces.read().await;
        workspaces
            .iter()
            .filter_map(|(owner, ws)| collect_batch(*owner, ws))
            .collect::<Vec<_>>()
    };

    // PHASE: FLUSH PER WORKSPACE + ACK
    // WHY: if a flush fails we intentionally keep the flags for retry.
    for batch in batches {
        match workspace::flush_workspace(&state.pool, batch.owner, &batch.flush).await {
            Ok(()) => {
                debug!(
                    owner = %batch.owner,
                    notes = batch.flush.notes.len(),
                    events = batch.flush.events.len(),
                    "workspace flushed"
                );
                ack_batch(state, &batch).await;
            }
            Err(e) => {
                error!(error = %e, owner = %batch.owner, "persistence flush failed");
            }
        }
    }
}

async fn ack_batch(state: &AppState, batch: &FlushBatch) {
    let mut workspaces = state.workspaces.write().await;
    let Some(ws) = workspaces.get_mut(&batch.owner) else {
        return;
    };
    let WorkspaceState { notes, events, note_writes, event_writes, .. } = ws;
    clear_flushed(note_writes, &batch.note_stamps, &batch.flush.removed_notes, |id| {
        notes.get(id).map(Entity::updated_at)
    });
    clear_flushed(event_writes, &batch.event_stamps, &batch.flush.removed_events, |id| {
        events.get(id).map(Entity::updated_at)
    });
}

/// Drop flags for writes that landed. An entity edited again after the
/// snapshot keeps its dirty flag; committed tombstones are dropped.
fn clear_flushed(
    writes: &mut PendingWrites,
    flushed: &HashMap<Uuid, DateTime<Utc>>,
    removed: &[Uuid],
    current_stamp: impl Fn(Uuid) -> Option<DateTime<Utc>>,
) {
    for (id, stamp) in flushed {
        // EDGE: keep dirty flag if the entity was updated after snapshot.
        let can_clear = match current_stamp(*id) {
            Some(current) => current == *stamp,
            None => true,
        };
        if can_clear {
            writes.dirty.remove(id);
        }
    }
    for id in removed {
        writes.removed.remove(id);
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
