use super::*;
use chrono::NaiveTime;

use super::event::EventDraft;
use super::note::{NoteDraft, NotePatch};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_733_000_000 + secs, 0).unwrap()
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

fn note_draft(title: &str, content: &str) -> NoteDraft {
    NoteDraft { title: title.into(), content: content.into(), ..NoteDraft::default() }
}

fn stored_note(title: &str, pinned: bool, updated: DateTime<Utc>) -> Note {
    Note {
        id: Uuid::new_v4(),
        title: title.into(),
        content: String::new(),
        tags: Vec::new(),
        pinned,
        created_at: ts(0),
        updated_at: updated,
    }
}

fn event_draft(title: &str, on: &str) -> EventDraft {
    EventDraft { title: title.into(), date: Some(date(on)), ..EventDraft::default() }
}

// =============================================================================
// create
// =============================================================================

#[test]
fn create_then_query_contains_entity_once() {
    let mut panel = EntityPanel::<Note>::new();
    let note = panel.create(note_draft("Standup", "notes")).unwrap();
    assert_eq!(note.created_at, note.updated_at);

    let view = panel.query(&Query::default());
    assert_eq!(view.iter().filter(|n| n.id == note.id).count(), 1);
    assert_eq!(view[0], note);
}

#[test]
fn create_with_blank_title_is_noop() {
    let mut panel = EntityPanel::<Note>::new();
    assert!(panel.create(note_draft("   ", "body")).is_none());
    assert!(panel.is_empty());
}

#[test]
fn create_event_without_date_is_noop() {
    let mut panel = EntityPanel::<Event>::new();
    let draft = EventDraft { title: "Review".into(), ..EventDraft::default() };
    assert!(panel.create(draft).is_none());
    assert!(panel.is_empty());
}

#[test]
fn create_assigns_distinct_ids() {
    let mut panel = EntityPanel::<Note>::new();
    let a = panel.create(note_draft("a", "")).unwrap();
    let b = panel.create(note_draft("b", "")).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(panel.len(), 2);
}

// =============================================================================
// update
// =============================================================================

#[test]
fn update_merges_patch_and_advances_updated_at() {
    let mut panel = EntityPanel::<Note>::new();
    let note = panel.create(note_draft("Draft", "old body")).unwrap();

    let patch = NotePatch { content: Some("new body".into()), ..NotePatch::default() };
    let updated = panel.update(note.id, patch).unwrap();

    assert_eq!(updated.title, "Draft");
    assert_eq!(updated.content, "new body");
    assert!(updated.updated_at > note.updated_at);
    assert_eq!(updated.created_at, note.created_at);
    assert_eq!(panel.query(&Query::default()), vec![updated]);
}

#[test]
fn back_to_back_updates_strictly_increase() {
    let mut panel = EntityPanel::<Note>::new();
    let note = panel.create(note_draft("x", "")).unwrap();
    let mut last = note.updated_at;
    for _ in 0..20 {
        let updated = panel.update(note.id, NotePatch::default()).unwrap();
        assert!(updated.updated_at > last);
        last = updated.updated_at;
    }
}

#[test]
fn update_missing_id_is_not_found_and_leaves_collection() {
    let mut panel = EntityPanel::<Note>::new();
    let note = panel.create(note_draft("keep", "")).unwrap();
    let before = panel.query(&Query::default());

    let missing = Uuid::new_v4();
    let err = panel.update(missing, NotePatch::default()).unwrap_err();
    assert!(matches!(err, PanelError::NotFound(id) if id == missing));
    assert_eq!(panel.query(&Query::default()), before);
    assert_eq!(panel.get(note.id), Some(&note));
}

#[test]
fn update_cannot_blank_the_title() {
    let mut panel = EntityPanel::<Note>::new();
    let note = panel.create(note_draft("keep", "body")).unwrap();

    let patch = NotePatch { title: Some("   ".into()), content: Some("lost".into()), ..NotePatch::default() };
    let err = panel.update(note.id, patch).unwrap_err();
    assert!(matches!(err, PanelError::Invalid(ValidationError::MissingTitle)));
    assert_eq!(panel.get(note.id), Some(&note));
}

#[test]
fn event_update_cannot_blank_the_title() {
    let mut panel = EntityPanel::<Event>::new();
    let event = panel.create(event_draft("Review", "2024-12-05")).unwrap();

    let patch: super::event::EventPatch = serde_json::from_str(r#"{"title":""}"#).unwrap();
    let err = panel.update(event.id, patch).unwrap_err();
    assert!(matches!(err, PanelError::Invalid(ValidationError::MissingTitle)));
    assert_eq!(panel.get(event.id), Some(&event));
}

// =============================================================================
// delete
// =============================================================================

#[test]
fn delete_is_idempotent() {
    let mut panel = EntityPanel::<Note>::new();
    let gone = panel.create(note_draft("gone", "")).unwrap();
    panel.create(note_draft("stays", "")).unwrap();

    assert!(panel.delete(gone.id).is_some());
    let once = panel.query(&Query::default());
    assert!(panel.delete(gone.id).is_none());
    assert_eq!(panel.query(&Query::default()), once);
    assert_eq!(once.len(), 1);
}

// =============================================================================
// query ordering
// =============================================================================

#[test]
fn pinned_note_sorts_before_newer_unpinned() {
    for pinned_first in [true, false] {
        let mut panel = EntityPanel::<Note>::new();
        let pinned = stored_note("pinned", true, ts(0));
        let fresh = stored_note("fresh", false, ts(10));
        if pinned_first {
            panel.insert_loaded(pinned.clone());
            panel.insert_loaded(fresh.clone());
        } else {
            panel.insert_loaded(fresh.clone());
            panel.insert_loaded(pinned.clone());
        }
        let titles = panel
            .query(&Query::default())
            .into_iter()
            .map(|n| n.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["pinned", "fresh"]);
    }
}

#[test]
fn unpinned_notes_sort_by_updated_desc() {
    let mut panel = EntityPanel::<Note>::new();
    panel.insert_loaded(stored_note("old", false, ts(1)));
    panel.insert_loaded(stored_note("new", false, ts(3)));
    panel.insert_loaded(stored_note("mid", false, ts(2)));
    let titles = panel
        .query(&Query::default())
        .into_iter()
        .map(|n| n.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["new", "mid", "old"]);
}

#[test]
fn editing_a_note_moves_it_to_the_top() {
    let mut panel = EntityPanel::<Note>::new();
    let first = panel.create(note_draft("first", "")).unwrap();
    panel.create(note_draft("second", "")).unwrap();
    panel.update(first.id, NotePatch::default()).unwrap();
    assert_eq!(panel.query(&Query::default())[0].id, first.id);
}

#[test]
fn events_sort_by_date_ascending() {
    let mut panel = EntityPanel::<Event>::new();
    let mut late = event_draft("late", "2024-12-05");
    late.time = Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    let mut early = event_draft("early", "2024-12-03");
    early.time = Some(NaiveTime::from_hms_opt(23, 0, 0).unwrap());
    panel.create(late).unwrap();
    panel.create(early).unwrap();

    let dates = panel
        .query_on(&Query::default(), date("2024-01-01"))
        .into_iter()
        .map(|e| e.date)
        .collect::<Vec<_>>();
    assert_eq!(dates, vec![date("2024-12-03"), date("2024-12-05")]);
}

// =============================================================================
// query filtering
// =============================================================================

#[test]
fn text_filter_matches_body_case_insensitively() {
    let mut panel = EntityPanel::<Note>::new();
    panel.create(note_draft("Meeting Notes", "Discussed project timeline")).unwrap();
    panel.create(note_draft("Ideas", "New feature ideas")).unwrap();

    let hits = panel.query(&Query::text("project").view(ViewMode::List));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "Discussed project timeline");

    assert_eq!(panel.query(&Query::text("PROJECT")).len(), 1);
}

#[test]
fn text_filter_is_a_plain_substring() {
    let mut panel = EntityPanel::<Note>::new();
    panel.create(note_draft("Ideas", "New feature ideas")).unwrap();

    assert!(panel.query(&Query::text("ideas ")).is_empty());
    assert_eq!(panel.query(&Query::text("feature ideas")).len(), 1);
}

#[test]
fn text_filter_matches_title() {
    let mut panel = EntityPanel::<Note>::new();
    panel.create(note_draft("Roadmap", "")).unwrap();
    panel.create(note_draft("Groceries", "")).unwrap();
    let hits = panel.query(&Query::text("road"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Roadmap");
}

#[test]
fn tag_filter_combines_with_text() {
    let mut panel = EntityPanel::<Note>::new();
    let mut work = note_draft("Plan", "project work");
    work.tags = vec!["work".into()];
    let mut home = note_draft("Plan", "project at home");
    home.tags = vec!["home".into()];
    panel.create(work).unwrap();
    panel.create(home).unwrap();

    let hits = panel.query(&Query::text("project").classification("home"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "project at home");
    assert!(panel.query(&Query::default().classification("missing")).is_empty());
}

#[test]
fn upcoming_view_keeps_today_and_later() {
    let mut panel = EntityPanel::<Event>::new();
    panel.create(event_draft("yesterday", "2024-12-02")).unwrap();
    let mut today = event_draft("today", "2024-12-03");
    today.time = Some(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    panel.create(today).unwrap();
    panel.create(event_draft("tomorrow", "2024-12-04")).unwrap();

    let titles = panel
        .query_on(&Query::default().view(ViewMode::Upcoming), date("2024-12-03"))
        .into_iter()
        .map(|e| e.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["today", "tomorrow"]);
}

#[test]
fn upcoming_view_does_not_hide_undated_notes() {
    let mut panel = EntityPanel::<Note>::new();
    panel.create(note_draft("note", "")).unwrap();
    assert_eq!(panel.query(&Query::default().view(ViewMode::Upcoming)).len(), 1);
}

// =============================================================================
// distinct_tags
// =============================================================================

#[test]
fn distinct_tags_tracks_current_collection() {
    let mut panel = EntityPanel::<Note>::new();
    let mut a = note_draft("a", "");
    a.tags = vec!["work".into(), "ideas".into()];
    let mut b = note_draft("b", "");
    b.tags = vec!["work".into()];
    let a = panel.create(a).unwrap();
    panel.create(b).unwrap();

    assert_eq!(panel.distinct_tags().into_iter().collect::<Vec<_>>(), vec!["ideas", "work"]);

    panel.delete(a.id);
    assert_eq!(panel.distinct_tags().into_iter().collect::<Vec<_>>(), vec!["work"]);
}

#[test]
fn distinct_tags_for_events_are_types() {
    let mut panel = EntityPanel::<Event>::new();
    let mut meeting = event_draft("sync", "2024-12-03");
    meeting.event_type = EventType::Meeting;
    panel.create(meeting).unwrap();
    panel.create(event_draft("misc", "2024-12-04")).unwrap();
    assert_eq!(panel.distinct_tags().into_iter().collect::<Vec<_>>(), vec!["meeting", "other"]);
}

#[test]
fn next_timestamp_bumps_past_future_prior() {
    let prior = Utc::now() + TimeDelta::seconds(60);
    assert_eq!(next_timestamp(Some(prior)), prior + TimeDelta::microseconds(1));
}
