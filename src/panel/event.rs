//! Calendar events: a dated entry with an optional time of day.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, ValidationError, form};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Meeting,
    Deadline,
    Reminder,
    Personal,
    #[default]
    Other,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Deadline => "deadline",
            Self::Reminder => "reminder",
            Self::Personal => "personal",
            Self::Other => "other",
        }
    }

    /// Parse the stored form. Unknown values yield `None`.
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "meeting" => Some(Self::Meeting),
            "deadline" => Some(Self::Deadline),
            "reminder" => Some(Self::Reminder),
            "personal" => Some(Self::Personal),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub event_type: EventType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Sort key; untimed events sit at midnight.
    #[must_use]
    pub fn starts_at(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.time.unwrap_or(NaiveTime::MIN))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "form::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "form::optional_time")]
    pub time: Option<NaiveTime>,
    #[serde(default, rename = "type", alias = "event_type")]
    pub event_type: EventType,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "form::optional_date")]
    pub date: Option<NaiveDate>,
    /// `Some(None)` clears the time.
    #[serde(default, deserialize_with = "form::patch_time")]
    pub time: Option<Option<NaiveTime>>,
    #[serde(default, rename = "type", alias = "event_type")]
    pub event_type: Option<EventType>,
    pub description: Option<String>,
}

impl Entity for Event {
    type Draft = EventDraft;
    type Patch = EventPatch;

    const KIND: &'static str = "event";

    fn validate(draft: &EventDraft) -> Result<(), ValidationError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if draft.date.is_none() {
            return Err(ValidationError::MissingDate);
        }
        Ok(())
    }

    fn from_draft(id: Uuid, draft: EventDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_owned(),
            // Validated drafts always carry a date.
            date: draft.date.unwrap_or_else(|| now.date_naive()),
            time: draft.time,
            event_type: draft.event_type,
            description: draft.description,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: EventPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_owned();
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn body(&self) -> &str {
        &self.description
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn classifications(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.event_type.as_str())
    }

    fn calendar_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn presentation_cmp(&self, other: &Self) -> Ordering {
        self.starts_at()
            .cmp(&other.starts_at())
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
