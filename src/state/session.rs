use std::collections::{HashMap, HashSet};

use super::data::{PhotoRecord, ReviewState, SessionSummary};

/// The ReviewSession holds the ordered working set of photos and the
/// review cursor.
///
/// Review decisions are stored on each [`PhotoRecord`]; the kept and
/// pending-delete sets are derived from them, so the two can never disagree
/// and never overlap. An id → position index is rebuilt whenever the list
/// changes shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSession {
    records: Vec<PhotoRecord>,
    index: HashMap<String, usize>,
    /// Position of the current photo. 0 doubles as the sentinel when empty.
    cursor: usize,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole session with `records`.
    ///
    /// The cursor goes back to the first photo and every decision is cleared.
    /// If the same id shows up twice, the first occurrence wins.
    pub fn load<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = PhotoRecord>,
    {
        let mut seen = HashSet::new();
        self.records = records
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .map(|mut record| {
                record.review_state = ReviewState::Unreviewed;
                record.kept_before_toggle = false;
                record
            })
            .collect();
        self.cursor = 0;
        self.rebuild_index();
    }

    /// The photo under the cursor, if any
    pub fn current_record(&self) -> Option<&PhotoRecord> {
        self.records.get(self.cursor)
    }

    pub fn record_at(&self, id: &str) -> Option<&PhotoRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Move to the next photo, stopping on the last one.
    pub fn advance_cursor(&mut self) {
        if self.cursor + 1 < self.records.len() {
            self.cursor += 1;
        }
    }

    /// Set the review state of `id`, returning the previous state.
    ///
    /// Returns `None` (and changes nothing) if the id is not in the session.
    pub fn set_state(&mut self, id: &str, state: ReviewState) -> Option<ReviewState> {
        let pos = *self.index.get(id)?;
        let record = &mut self.records[pos];
        let previous = record.review_state;
        if previous != state {
            record.review_state = state;
            record.kept_before_toggle =
                previous == ReviewState::Kept && state == ReviewState::PendingDelete;
        }
        Some(previous)
    }

    /// Remove every record whose id is in `ids`.
    ///
    /// Survivors keep their relative order. The cursor is clamped to the last
    /// valid position (or the sentinel when nothing is left); it does not try
    /// to follow a photo that was removed. Returns how many records were
    /// removed. Unknown ids are ignored.
    pub fn remove_records(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.records.len();
        self.records.retain(|record| !ids.contains(&record.id));
        let removed = before - self.records.len();

        if removed > 0 {
            self.rebuild_index();
            self.cursor = self.cursor.min(self.records.len().saturating_sub(1));
        }
        removed
    }

    /// All photos in session order
    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ids marked for deletion, in session order
    pub fn pending_delete_ids(&self) -> Vec<String> {
        self.ids_in_state(ReviewState::PendingDelete)
    }

    /// Ids the user chose to keep, in session order
    pub fn kept_ids(&self) -> Vec<String> {
        self.ids_in_state(ReviewState::Kept)
    }

    pub fn pending_count(&self) -> usize {
        self.count_in_state(ReviewState::PendingDelete)
    }

    pub fn kept_count(&self) -> usize {
        self.count_in_state(ReviewState::Kept)
    }

    /// Photos that carry any decision
    pub fn reviewed_count(&self) -> usize {
        self.records.len() - self.count_in_state(ReviewState::Unreviewed)
    }

    /// Counts and cursor position; the controller fills in the flags
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total: self.records.len(),
            cursor: self.cursor,
            current_id: self.current_record().map(|record| record.id.clone()),
            pending_delete: self.pending_count(),
            kept: self.kept_count(),
            ..Default::default()
        }
    }

    fn ids_in_state(&self, state: ReviewState) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.review_state == state)
            .map(|record| record.id.clone())
            .collect()
    }

    fn count_in_state(&self, state: ReviewState) -> usize {
        self.records
            .iter()
            .filter(|record| record.review_state == state)
            .count()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id.clone(), pos))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_of(n: usize) -> ReviewSession {
        let mut session = ReviewSession::new();
        session.load((0..n).map(|i| PhotoRecord::new(format!("id{}", i), None)));
        session
    }

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_resets_cursor_and_decisions() {
        let mut session = session_of(3);
        session.advance_cursor();
        session.set_state("id0", ReviewState::Kept);
        session.set_state("id1", ReviewState::PendingDelete);

        let mut decided = PhotoRecord::new("fresh", None);
        decided.review_state = ReviewState::Kept;
        session.load(vec![decided, PhotoRecord::new("other", None)]);

        assert_eq!(session.cursor(), 0);
        assert_eq!(session.len(), 2);
        assert_eq!(session.kept_count(), 0);
        assert_eq!(session.pending_count(), 0);
        assert!(session.record_at("id0").is_none());
        assert_eq!(session.current_record().unwrap().id, "fresh");
    }

    #[test]
    fn test_load_drops_duplicate_ids() {
        let mut session = ReviewSession::new();
        session.load(vec![
            PhotoRecord::new("a", None),
            PhotoRecord::new("b", None),
            PhotoRecord::new("a", None),
        ]);
        assert_eq!(session.len(), 2);
        assert_eq!(session.records()[1].id, "b");
    }

    #[test]
    fn test_advance_saturates_at_end() {
        let mut session = session_of(3);
        for _ in 0..10 {
            session.advance_cursor();
        }
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.current_record().unwrap().id, "id2");
    }

    #[test]
    fn test_empty_session_has_no_current_record() {
        let mut session = ReviewSession::new();
        session.advance_cursor();
        assert_eq!(session.cursor(), 0);
        assert!(session.current_record().is_none());
        assert!(session.summary().current_id.is_none());
    }

    #[test]
    fn test_states_are_exclusive() {
        let mut session = session_of(2);
        session.set_state("id0", ReviewState::Kept);
        session.set_state("id0", ReviewState::PendingDelete);

        assert_eq!(session.pending_delete_ids(), vec!["id0".to_string()]);
        assert!(session.kept_ids().is_empty());
        assert_eq!(session.reviewed_count(), 1);
    }

    #[test]
    fn test_repeated_delete_keeps_kept_marker() {
        let mut session = session_of(1);
        session.set_state("id0", ReviewState::Kept);
        session.set_state("id0", ReviewState::PendingDelete);
        assert!(session.records()[0].kept_before_toggle);

        assert_eq!(
            session.set_state("id0", ReviewState::PendingDelete),
            Some(ReviewState::PendingDelete)
        );
        assert!(session.records()[0].kept_before_toggle);

        session.set_state("id0", ReviewState::Unreviewed);
        assert!(!session.records()[0].kept_before_toggle);
    }

    #[test]
    fn test_set_state_unknown_id() {
        let mut session = session_of(1);
        assert_eq!(session.set_state("nope", ReviewState::Kept), None);
        assert_eq!(session.kept_count(), 0);
    }

    #[test]
    fn test_remove_preserves_order_and_clamps_cursor() {
        let mut session = session_of(5);
        for _ in 0..4 {
            session.advance_cursor();
        }
        session.set_state("id3", ReviewState::PendingDelete);
        session.set_state("id4", ReviewState::PendingDelete);
        session.set_state("id0", ReviewState::Kept);

        let removed = session.remove_records(&ids(&["id3", "id4", "missing"]));

        assert_eq!(removed, 2);
        let order: Vec<&str> = session.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["id0", "id1", "id2"]);
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.kept_ids(), vec!["id0".to_string()]);
        assert_eq!(session.record_at("id2").unwrap().id, "id2");
    }

    #[test]
    fn test_remove_keeps_cursor_when_in_range() {
        let mut session = session_of(5);
        session.advance_cursor();
        session.remove_records(&ids(&["id0"]));
        // Cursor index stays put, which now shows the following photo.
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.current_record().unwrap().id, "id2");
    }

    #[test]
    fn test_remove_everything_resets_to_sentinel() {
        let mut session = session_of(2);
        session.advance_cursor();
        session.remove_records(&ids(&["id0", "id1"]));
        assert!(session.is_empty());
        assert_eq!(session.cursor(), 0);
        assert!(session.current_record().is_none());
    }
}
