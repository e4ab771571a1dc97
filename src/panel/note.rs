//! Notes: free-form text with tags and a pin flag.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, ValidationError, form};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "form::tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "form::optional_tags")]
    pub tags: Option<Vec<String>>,
    pub pinned: Option<bool>,
}

impl Entity for Note {
    type Draft = NoteDraft;
    type Patch = NotePatch;

    const KIND: &'static str = "note";

    fn validate(draft: &NoteDraft) -> Result<(), ValidationError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        Ok(())
    }

    fn from_draft(id: Uuid, draft: NoteDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_owned(),
            content: draft.content,
            tags: form::normalize_tags(draft.tags),
            pinned: draft.pinned,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_owned();
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = form::normalize_tags(tags);
        }
        if let Some(pinned) = patch.pinned {
            self.pinned = pinned;
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn body(&self) -> &str {
        &self.content
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn classifications(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Pinned first, then most recently updated, then id.
    fn presentation_cmp(&self, other: &Self) -> Ordering {
        other
            .pinned
            .cmp(&self.pinned)
            .then_with(|| other.updated_at.cmp(&self.updated_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
#[path = "note_test.rs"]
mod tests;
