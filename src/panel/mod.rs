//! Generic in-memory entity collection with filter and sort.
//!
//! DESIGN
//! ======
//! `EntityPanel<E>` owns a map keyed by entity id. Storage order is
//! irrelevant: every read goes through `query_on`, which filters and then
//! sorts with `Entity::presentation_cmp`. That comparator is the only ordering
//! in the module, so create-time and query-time order cannot disagree.
//!
//! Invalid drafts are a silent no-op in `create`. Callers that want to report
//! the reason use `create_checked`.

pub mod event;
pub mod form;
pub mod note;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Local, NaiveDate, SubsecRound, TimeDelta, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

pub use event::{Event, EventType};
pub use note::Note;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("entity not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("date is required")]
    MissingDate,
}

// =============================================================================
// ENTITY
// =============================================================================

/// A user-authored record managed by an `EntityPanel`.
pub trait Entity: Clone {
    /// Fields supplied on create.
    type Draft;
    /// Partial update merged over an existing entity.
    type Patch;

    /// Short label used in logs.
    const KIND: &'static str;

    /// Check the required fields of a draft.
    ///
    /// # Errors
    ///
    /// Returns the first missing required field.
    fn validate(draft: &Self::Draft) -> Result<(), ValidationError>;

    /// Build a new entity. `created_at` and `updated_at` are both `now`.
    fn from_draft(id: Uuid, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch);

    /// Required fields of a stored entity. A patch may not clear them.
    ///
    /// # Errors
    ///
    /// Returns the first missing required field.
    fn check_required(&self) -> Result<(), ValidationError> {
        if self.title().trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        Ok(())
    }

    fn id(&self) -> Uuid;
    fn title(&self) -> &str;
    fn body(&self) -> &str;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Tags or type names used by the classification filter.
    fn classifications(&self) -> impl Iterator<Item = &str>;

    /// Calendar day the entity falls on, if it has one.
    fn calendar_date(&self) -> Option<NaiveDate> {
        None
    }

    /// Presentation order. Must be a total order.
    fn presentation_cmp(&self, other: &Self) -> Ordering;
}

/// Wall clock truncated to microseconds (the precision Postgres stores),
/// bumped past `prior` so successive writes are strictly increasing.
pub(crate) fn next_timestamp(prior: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match prior {
        Some(prior) if now <= prior => prior + TimeDelta::microseconds(1),
        _ => now,
    }
}

// =============================================================================
// QUERY
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    /// Only dated entities on or after the start of today.
    Upcoming,
}

/// Filter applied by `EntityPanel::query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Case-insensitive substring matched against title and body.
    pub text: String,
    /// Tag or type name; `None` admits every classification.
    pub classification: Option<String>,
    pub view: ViewMode,
}

impl Query {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    #[must_use]
    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    #[must_use]
    pub fn view(mut self, view: ViewMode) -> Self {
        self.view = view;
        self
    }

    fn admits<E: Entity>(&self, entity: &E, needle: &str, today: NaiveDate) -> bool {
        let text_ok = needle.is_empty()
            || entity.title().to_lowercase().contains(needle)
            || entity.body().to_lowercase().contains(needle);
        if !text_ok {
            return false;
        }

        if let Some(wanted) = self.classification.as_deref() {
            if !entity.classifications().any(|c| c == wanted) {
                return false;
            }
        }

        match (self.view, entity.calendar_date()) {
            (ViewMode::Upcoming, Some(date)) => date >= today,
            _ => true,
        }
    }
}

// =============================================================================
// PANEL
// =============================================================================

#[derive(Debug, Clone)]
pub struct EntityPanel<E: Entity> {
    entities: HashMap<Uuid, E>,
    /// Last timestamp handed out; keeps writes strictly ordered.
    last_stamp: Option<DateTime<Utc>>,
}

impl<E: Entity> Default for EntityPanel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityPanel<E> {
    #[must_use]
    pub fn new() -> Self {
        Self { entities: HashMap::new(), last_stamp: None }
    }

    fn stamp(&mut self, floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let prior = match (self.last_stamp, floor) {
            (Some(last), Some(floor)) => Some(last.max(floor)),
            (last, floor) => last.or(floor),
        };
        let at = next_timestamp(prior);
        self.last_stamp = Some(at);
        at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&E> {
        self.entities.get(&id)
    }

    /// Insert an entity loaded from storage, keeping its stored timestamps.
    pub fn insert_loaded(&mut self, entity: E) {
        self.entities.insert(entity.id(), entity);
    }

    /// Create an entity from a draft. Returns `None` and leaves the
    /// collection unchanged when the draft is missing a required field.
    pub fn create(&mut self, draft: E::Draft) -> Option<E> {
        match self.create_checked(draft) {
            Ok(entity) => Some(entity),
            Err(reason) => {
                debug!(kind = E::KIND, %reason, "draft rejected");
                None
            }
        }
    }

    /// `create`, reporting why a draft was rejected.
    ///
    /// # Errors
    ///
    /// Returns the first missing required field; nothing is inserted.
    pub fn create_checked(&mut self, draft: E::Draft) -> Result<E, ValidationError> {
        E::validate(&draft)?;

        let mut id = Uuid::new_v4();
        while self.entities.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let now = self.stamp(None);
        let entity = E::from_draft(id, draft, now);
        self.entities.insert(id, entity.clone());
        Ok(entity)
    }

    /// Merge `patch` over an existing entity and refresh `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entity has `id`, or `Invalid` if the merged
    /// entity is missing a required field. Either way the collection is
    /// unchanged.
    pub fn update(&mut self, id: Uuid, patch: E::Patch) -> Result<E, PanelError> {
        let mut merged = self.entities.get(&id).ok_or(PanelError::NotFound(id))?.clone();
        merged.apply_patch(patch);
        merged.check_required()?;

        let at = self.stamp(Some(merged.updated_at()));
        merged.set_updated_at(at);
        self.entities.insert(id, merged.clone());
        Ok(merged)
    }

    /// Remove an entity. Absent ids are a no-op.
    pub fn delete(&mut self, id: Uuid) -> Option<E> {
        self.entities.remove(&id)
    }

    /// Filtered view in presentation order, relative to the local calendar day.
    #[must_use]
    pub fn query(&self, query: &Query) -> Vec<E> {
        self.query_on(query, Local::now().date_naive())
    }

    /// Filtered view in presentation order, with "today" supplied by the caller.
    #[must_use]
    pub fn query_on(&self, query: &Query, today: NaiveDate) -> Vec<E> {
        let needle = query.text.to_lowercase();
        let mut view = self
            .entities
            .values()
            .filter(|entity| query.admits(*entity, &needle, today))
            .cloned()
            .collect::<Vec<_>>();
        view.sort_by(E::presentation_cmp);
        view
    }

    /// Every classification currently present.
    #[must_use]
    pub fn distinct_tags(&self) -> BTreeSet<String> {
        self.entities
            .values()
            .flat_map(|entity| entity.classifications().map(str::to_owned))
            .collect()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
