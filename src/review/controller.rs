use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::error::ReviewError;
use crate::library::{AccessStatus, PhotoLibrary, TargetSize};
use crate::state::data::same_local_day;
use crate::state::{AssetInfo, PhotoRecord, RelatedGroup, ReviewSession, ReviewState, SessionSummary};

/// What toggling a pending deletion off turns the photo back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TogglePolicy {
    /// Always back to `Unreviewed`, even if the photo had been kept.
    #[default]
    #[serde(rename = "reset")]
    ResetToUnreviewed,
    /// Back to `Kept` when the photo was kept right before being marked.
    #[serde(rename = "restore-kept")]
    RestoreKept,
}

/// A decoded photo together with the id it was requested for
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub id: String,
    pub image: DynamicImage,
}

#[derive(Debug, Default)]
struct Inner {
    session: ReviewSession,
    is_loading: bool,
    load_error: Option<String>,
}

/// Clears the commit flag when a commit ends, even if its future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Operations layer over a [`ReviewSession`].
///
/// The controller is meant to be shared (`Arc<ReviewController<_>>`) between
/// the presentation layer and background tasks. Session mutations take a
/// short lock that is never held across an `.await`; every change is
/// published as a [`SessionSummary`] to [`subscribe`](Self::subscribe).
pub struct ReviewController<L: PhotoLibrary> {
    library: Arc<L>,
    inner: Mutex<Inner>,
    toggle_policy: TogglePolicy,
    /// Set while a commit is waiting on the library.
    deleting: AtomicBool,
    changes: watch::Sender<SessionSummary>,
}

impl<L: PhotoLibrary> ReviewController<L> {
    pub fn new(library: Arc<L>) -> Self {
        let (changes, _) = watch::channel(SessionSummary::default());
        Self {
            library,
            inner: Mutex::new(Inner::default()),
            toggle_policy: TogglePolicy::default(),
            deleting: AtomicBool::new(false),
            changes,
        }
    }

    pub fn with_toggle_policy(mut self, policy: TogglePolicy) -> Self {
        self.toggle_policy = policy;
        self
    }

    pub fn library(&self) -> &Arc<L> {
        &self.library
    }

    /// Receive a fresh [`SessionSummary`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSummary> {
        self.changes.subscribe()
    }

    pub fn summary(&self) -> SessionSummary {
        let inner = self.lock();
        self.summary_of(&inner)
    }

    /// Ask for access and replace the session with the library's photos.
    ///
    /// On failure the previous session is left as it was and the error
    /// message is kept in the summary. Returns the number of photos loaded.
    pub async fn load(&self) -> Result<usize, ReviewError> {
        {
            let mut inner = self.lock();
            inner.is_loading = true;
            inner.load_error = None;
        }
        self.publish();

        let fetched = self.fetch_assets().await;

        let result = {
            let mut inner = self.lock();
            inner.is_loading = false;
            match fetched {
                Ok(assets) => {
                    inner.session.load(assets.into_iter().map(PhotoRecord::from));
                    Ok(inner.session.len())
                }
                Err(e) => {
                    inner.load_error = Some(e.to_string());
                    Err(e)
                }
            }
        };
        self.publish();

        match &result {
            Ok(count) => tracing::info!("📷 Loaded {} photos for review", count),
            Err(e) => tracing::warn!("Loading photos failed: {}", e),
        }
        result
    }

    async fn fetch_assets(&self) -> Result<Vec<AssetInfo>, ReviewError> {
        match self.library.request_access().await {
            AccessStatus::Authorized | AccessStatus::Limited => {}
            AccessStatus::Denied => return Err(ReviewError::AccessDenied),
            AccessStatus::Restricted => return Err(ReviewError::AccessRestricted),
            AccessStatus::NotDetermined => return Err(ReviewError::AccessNotDetermined),
        }
        Ok(self.library.list_all_photos().await?)
    }

    pub fn current_record(&self) -> Option<PhotoRecord> {
        self.lock().session.current_record().cloned()
    }

    pub fn record_at(&self, id: &str) -> Option<PhotoRecord> {
        self.lock().session.record_at(id).cloned()
    }

    /// Every photo in session order, for grid display
    pub fn records(&self) -> Vec<PhotoRecord> {
        self.lock().session.records().to_vec()
    }

    pub fn pending_delete_ids(&self) -> Vec<String> {
        self.lock().session.pending_delete_ids()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().session.pending_count()
    }

    pub fn kept_count(&self) -> usize {
        self.lock().session.kept_count()
    }

    /// "Photo X of N" for the current photo
    pub fn progress(&self) -> Option<String> {
        self.summary().progress()
    }

    /// Keep the current photo and move on. Returns the id that was kept.
    pub fn mark_keep(&self) -> Result<String, ReviewError> {
        self.decide_current(ReviewState::Kept)
    }

    /// Mark the current photo for deletion and move on.
    pub fn mark_delete(&self) -> Result<String, ReviewError> {
        self.decide_current(ReviewState::PendingDelete)
    }

    fn decide_current(&self, state: ReviewState) -> Result<String, ReviewError> {
        let id = {
            let mut inner = self.lock();
            let id = inner
                .session
                .current_record()
                .map(|record| record.id.clone())
                .ok_or(ReviewError::NoCurrentRecord)?;
            inner.session.set_state(&id, state);
            inner.session.advance_cursor();
            id
        };
        tracing::debug!("{} -> {}", id, state.as_str());
        self.publish();
        Ok(id)
    }

    /// Flip `id` in or out of the pending-deletion set without moving the
    /// cursor. Returns the photo's new state.
    pub fn toggle_deletion(&self, id: &str) -> Result<ReviewState, ReviewError> {
        let state = {
            let mut inner = self.lock();
            let record = inner
                .session
                .record_at(id)
                .ok_or_else(|| ReviewError::UnknownPhoto(id.to_string()))?;

            let next = if record.is_pending_delete() {
                match self.toggle_policy {
                    TogglePolicy::RestoreKept if record.kept_before_toggle => ReviewState::Kept,
                    _ => ReviewState::Unreviewed,
                }
            } else {
                ReviewState::PendingDelete
            };
            inner.session.set_state(id, next);
            next
        };
        tracing::debug!("{} toggled -> {}", id, state.as_str());
        self.publish();
        Ok(state)
    }

    /// Photos taken on the same local calendar day as `record`, including
    /// `record` itself, in session order. Empty when `record` has no date.
    pub fn related_records(&self, record: &PhotoRecord) -> Vec<PhotoRecord> {
        let Some(date) = record.creation_date else {
            return Vec::new();
        };
        self.lock()
            .session
            .records()
            .iter()
            .filter(|other| other.creation_date.is_some_and(|d| same_local_day(date, d)))
            .cloned()
            .collect()
    }

    /// [`related_records`](Self::related_records) with a heading for display
    pub fn related_group(&self, record: &PhotoRecord) -> Option<RelatedGroup> {
        let day = record.creation_date?.with_timezone(&chrono::Local).date_naive();
        Some(RelatedGroup {
            id: day.format("%Y-%m-%d").to_string(),
            title: day.format("%A, %B %-d, %Y").to_string(),
            photos: self.related_records(record),
        })
    }

    /// Delete every photo marked for deletion.
    ///
    /// All or nothing: on failure the session is untouched and the pending
    /// set stays as it was, so the commit can simply be retried. Photos
    /// marked while the commit is in flight stay pending for the next one.
    /// Returns how many photos left the session.
    pub async fn commit_deletion(&self) -> Result<usize, ReviewError> {
        if self
            .deleting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Commit rejected: another deletion is in flight");
            return Err(ReviewError::DeletionInProgress);
        }
        let in_flight = InFlight(&self.deleting);

        let ids = self.lock().session.pending_delete_ids();
        if ids.is_empty() {
            return Err(ReviewError::EmptySelection);
        }

        tracing::info!("Deleting {} photos", ids.len());
        self.publish();

        let outcome = self.library.delete_assets(&ids).await;

        let result = match outcome {
            Ok(()) => {
                let doomed: HashSet<String> = ids.into_iter().collect();
                let removed = self.lock().session.remove_records(&doomed);
                tracing::info!("✅ Deleted {} photos", removed);
                Ok(removed)
            }
            Err(e) => {
                tracing::warn!("Deletion failed: {}", e);
                Err(ReviewError::DeletionFailed(e.to_string()))
            }
        };

        drop(in_flight);
        self.publish();
        result
    }

    /// Load the current photo's image.
    ///
    /// If the user moved on while it was loading, the result is discarded and
    /// `None` is returned, so a late image never lands on the wrong card.
    pub async fn load_current_image(&self, size: TargetSize) -> Option<LoadedImage> {
        let id = self.current_record()?.id;
        let image = self.library.load_image(&id, size).await?;

        let still_current = self
            .lock()
            .session
            .current_record()
            .is_some_and(|record| record.id == id);
        if !still_current {
            tracing::debug!("Discarding stale image for {}", id);
            return None;
        }
        Some(LoadedImage { id, image })
    }

    /// Load any photo of the session (e.g. for the related grid).
    pub async fn load_image(&self, id: &str, size: TargetSize) -> Option<LoadedImage> {
        if !self.lock().session.contains(id) {
            return None;
        }
        let image = self.library.load_image(id, size).await?;
        Some(LoadedImage {
            id: id.to_string(),
            image,
        })
    }

    fn summary_of(&self, inner: &Inner) -> SessionSummary {
        SessionSummary {
            is_loading: inner.is_loading,
            load_error: inner.load_error.clone(),
            deletion_in_progress: self.deleting.load(Ordering::Acquire),
            ..inner.session.summary()
        }
    }

    fn publish(&self) {
        let summary = self.summary();
        self.changes.send_replace(summary);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::InMemoryLibrary;
    use chrono::{DateTime, Local, TimeZone, Utc};
    use image::GenericImageView;

    type Controller = ReviewController<InMemoryLibrary>;

    fn day(d: u32) -> Option<DateTime<Utc>> {
        Some(
            Local
                .with_ymd_and_hms(2024, 3, d, 12, 0, 0)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    fn undated(n: usize) -> Vec<AssetInfo> {
        (0..n).map(|i| AssetInfo::new(format!("p{}", i), None)).collect()
    }

    async fn loaded(assets: Vec<AssetInfo>) -> (Arc<InMemoryLibrary>, Arc<Controller>) {
        let library = Arc::new(InMemoryLibrary::new(assets));
        let controller = Arc::new(ReviewController::new(Arc::clone(&library)));
        controller.load().await.unwrap();
        (library, controller)
    }

    fn ids(records: &[PhotoRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn assert_consistent(controller: &Controller) {
        let records = controller.records();
        let pending: HashSet<String> = controller.pending_delete_ids().into_iter().collect();
        let kept: HashSet<String> = records
            .iter()
            .filter(|r| r.is_kept())
            .map(|r| r.id.clone())
            .collect();
        let present: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

        assert!(pending.is_disjoint(&kept));
        assert!(pending.is_subset(&present));
        assert!(kept.is_subset(&present));
        let summary = controller.summary();
        if records.is_empty() {
            assert_eq!(summary.cursor, 0);
        } else {
            assert!(summary.cursor < records.len());
        }
    }

    #[tokio::test]
    async fn test_load_replaces_session_and_discards_decisions() {
        let (library, controller) = loaded(undated(3)).await;
        controller.mark_keep().unwrap();
        controller.mark_delete().unwrap();

        library.remove_externally("p0");
        assert_eq!(controller.load().await.unwrap(), 2);

        assert_eq!(ids(&controller.records()), vec!["p1", "p2"]);
        assert_eq!(controller.pending_count(), 0);
        assert_eq!(controller.kept_count(), 0);
        assert_eq!(controller.current_record().unwrap().id, "p1");
        assert!(!controller.summary().is_loading);
    }

    #[tokio::test]
    async fn test_limited_access_still_loads() {
        let library = Arc::new(InMemoryLibrary::new(undated(2)));
        library.set_access(AccessStatus::Limited);
        let controller = ReviewController::new(library);
        assert_eq!(controller.load().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_access_errors_leave_session_alone() {
        let (library, controller) = loaded(undated(2)).await;
        controller.mark_delete().unwrap();

        library.set_access(AccessStatus::Denied);
        assert!(matches!(controller.load().await, Err(ReviewError::AccessDenied)));
        let summary = controller.summary();
        assert_eq!(
            summary.load_error.as_deref(),
            Some("Photo library access denied. Please enable access in Settings.")
        );
        assert_eq!(summary.pending_delete, 1);
        assert_eq!(summary.total, 2);

        library.set_access(AccessStatus::Restricted);
        assert!(matches!(controller.load().await, Err(ReviewError::AccessRestricted)));

        library.set_access(AccessStatus::NotDetermined);
        assert!(matches!(controller.load().await, Err(ReviewError::AccessNotDetermined)));

        library.set_access(AccessStatus::Authorized);
        controller.load().await.unwrap();
        assert_eq!(controller.summary().load_error, None);
    }

    #[tokio::test]
    async fn test_mark_keep_and_delete_advance() {
        let (_library, controller) = loaded(undated(3)).await;

        assert_eq!(controller.mark_keep().unwrap(), "p0");
        assert_eq!(controller.mark_delete().unwrap(), "p1");

        assert_eq!(controller.record_at("p0").unwrap().review_state, ReviewState::Kept);
        assert_eq!(
            controller.record_at("p1").unwrap().review_state,
            ReviewState::PendingDelete
        );
        assert_eq!(controller.current_record().unwrap().id, "p2");
        assert_eq!(controller.progress().as_deref(), Some("Photo 3 of 3"));
        assert_consistent(&controller);
    }

    #[tokio::test]
    async fn test_cursor_saturates_on_last_photo() {
        let (_library, controller) = loaded(undated(2)).await;
        for _ in 0..5 {
            controller.mark_keep().unwrap();
        }
        assert_eq!(controller.summary().cursor, 1);
        assert_eq!(controller.kept_count(), 2);
    }

    #[tokio::test]
    async fn test_pending_photo_can_be_kept() {
        let (_library, controller) = loaded(undated(1)).await;
        controller.mark_delete().unwrap();
        controller.mark_keep().unwrap();

        assert_eq!(controller.record_at("p0").unwrap().review_state, ReviewState::Kept);
        assert_eq!(controller.pending_count(), 0);
        assert_consistent(&controller);
    }

    #[tokio::test]
    async fn test_marking_an_empty_session_is_a_no_op() {
        let (_library, controller) = loaded(Vec::new()).await;
        let mut rx = controller.subscribe();
        rx.mark_unchanged();

        assert!(matches!(controller.mark_keep(), Err(ReviewError::NoCurrentRecord)));
        assert!(matches!(controller.mark_delete(), Err(ReviewError::NoCurrentRecord)));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(controller.summary(), SessionSummary::default());
    }

    #[tokio::test]
    async fn test_toggle_after_keep_does_not_restore_keep() {
        let (_library, controller) = loaded(undated(3)).await;
        controller.mark_keep().unwrap();

        assert_eq!(controller.toggle_deletion("p0").unwrap(), ReviewState::PendingDelete);
        assert_eq!(controller.kept_count(), 0);
        assert_eq!(controller.toggle_deletion("p0").unwrap(), ReviewState::Unreviewed);
        assert_eq!(controller.pending_count(), 0);
        assert_eq!(controller.kept_count(), 0);
        assert_consistent(&controller);
    }

    #[tokio::test]
    async fn test_restore_kept_policy() {
        let library = Arc::new(InMemoryLibrary::new(undated(3)));
        let controller =
            ReviewController::new(library).with_toggle_policy(TogglePolicy::RestoreKept);
        controller.load().await.unwrap();
        controller.mark_keep().unwrap();

        controller.toggle_deletion("p0").unwrap();
        assert_eq!(controller.toggle_deletion("p0").unwrap(), ReviewState::Kept);

        // A photo that was never kept still goes back to unreviewed.
        controller.toggle_deletion("p2").unwrap();
        assert_eq!(controller.toggle_deletion("p2").unwrap(), ReviewState::Unreviewed);
    }

    #[tokio::test]
    async fn test_restore_kept_survives_delete_on_last_photo() {
        let library = Arc::new(InMemoryLibrary::new(undated(1)));
        let controller =
            ReviewController::new(library).with_toggle_policy(TogglePolicy::RestoreKept);
        controller.load().await.unwrap();

        controller.mark_keep().unwrap();
        controller.toggle_deletion("p0").unwrap();
        // Cursor is saturated on p0, so this re-marks the same photo.
        assert_eq!(controller.mark_delete().unwrap(), "p0");

        assert_eq!(controller.toggle_deletion("p0").unwrap(), ReviewState::Kept);
        assert_eq!(controller.kept_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_keeps_cursor_and_rejects_unknown_ids() {
        let (_library, controller) = loaded(undated(3)).await;
        controller.toggle_deletion("p2").unwrap();

        assert_eq!(controller.summary().cursor, 0);
        assert!(matches!(
            controller.toggle_deletion("nope"),
            Err(ReviewError::UnknownPhoto(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_related_records_same_day() {
        let assets = vec![
            AssetInfo::new("a", day(1)),
            AssetInfo::new("b", day(1)),
            AssetInfo::new("c", day(2)),
            AssetInfo::new("d", day(3)),
            AssetInfo::new("e", day(1)),
        ];
        let (_library, controller) = loaded(assets).await;
        let first = controller.current_record().unwrap();

        let related = controller.related_records(&first);
        assert_eq!(ids(&related), vec!["a", "b", "e"]);

        let group = controller.related_group(&first).unwrap();
        assert_eq!(group.id, "2024-03-01");
        assert_eq!(group.title, "Friday, March 1, 2024");
        assert_eq!(group.photos.len(), 3);
    }

    #[tokio::test]
    async fn test_related_records_undated_is_empty() {
        let (_library, controller) = loaded(vec![
            AssetInfo::new("a", None),
            AssetInfo::new("b", None),
        ])
        .await;
        let first = controller.current_record().unwrap();
        assert!(controller.related_records(&first).is_empty());
        assert!(controller.related_group(&first).is_none());
    }

    #[tokio::test]
    async fn test_commit_removes_pending_and_clamps_cursor() {
        let (library, controller) = loaded(undated(4)).await;
        controller.mark_delete().unwrap(); // p0
        controller.mark_keep().unwrap(); // p1
        controller.mark_delete().unwrap(); // p2

        assert_eq!(controller.commit_deletion().await.unwrap(), 2);

        assert_eq!(ids(&controller.records()), vec!["p1", "p3"]);
        assert_eq!(controller.pending_count(), 0);
        assert_eq!(controller.kept_count(), 1);
        assert_eq!(controller.summary().cursor, 1);
        assert_eq!(
            library.delete_calls(),
            vec![vec!["p0".to_string(), "p2".to_string()]]
        );
        assert!(!controller.summary().deletion_in_progress);
        assert_consistent(&controller);
    }

    #[tokio::test]
    async fn test_failed_commit_changes_nothing() {
        let (library, controller) = loaded(undated(3)).await;
        controller.mark_delete().unwrap();
        controller.mark_delete().unwrap();
        let before_records = controller.records();
        let before_summary = controller.summary();

        library.fail_deletions("user cancelled");
        let err = controller.commit_deletion().await.unwrap_err();

        assert!(matches!(&err, ReviewError::DeletionFailed(reason) if reason == "user cancelled"));
        assert_eq!(controller.records(), before_records);
        assert_eq!(controller.summary(), before_summary);

        // Retrying after the failure goes through.
        library.allow_deletions();
        assert_eq!(controller.commit_deletion().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_selection_does_no_work() {
        let (library, controller) = loaded(undated(2)).await;
        controller.mark_keep().unwrap();

        assert!(matches!(
            controller.commit_deletion().await,
            Err(ReviewError::EmptySelection)
        ));
        assert!(library.delete_calls().is_empty());
        assert!(!controller.summary().deletion_in_progress);
    }

    #[tokio::test]
    async fn test_single_photo_delete_and_commit() {
        let (_library, controller) = loaded(undated(1)).await;
        controller.mark_delete().unwrap();
        assert_eq!(controller.summary().cursor, 0);
        assert_eq!(controller.pending_delete_ids(), vec!["p0".to_string()]);

        assert_eq!(controller.commit_deletion().await.unwrap(), 1);
        assert!(controller.records().is_empty());
        assert_eq!(controller.summary().cursor, 0);
        assert!(controller.current_record().is_none());
        assert!(controller.progress().is_none());
    }

    #[tokio::test]
    async fn test_second_commit_while_first_in_flight_is_rejected() {
        let (library, controller) = loaded(undated(3)).await;
        controller.mark_delete().unwrap();
        let gate = library.hold_deletions();
        let mut rx = controller.subscribe();

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.commit_deletion().await }
        });
        rx.wait_for(|s| s.deletion_in_progress).await.unwrap();

        assert!(matches!(
            controller.commit_deletion().await,
            Err(ReviewError::DeletionInProgress)
        ));

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), 1);
        assert_eq!(library.delete_calls().len(), 1);
        assert_eq!(ids(&controller.records()), vec!["p1", "p2"]);
        assert!(!controller.summary().deletion_in_progress);
    }

    #[tokio::test]
    async fn test_marks_made_during_commit_stay_pending() {
        let (library, controller) = loaded(undated(3)).await;
        controller.mark_delete().unwrap(); // p0
        let gate = library.hold_deletions();
        let mut rx = controller.subscribe();

        let commit = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.commit_deletion().await }
        });
        rx.wait_for(|s| s.deletion_in_progress).await.unwrap();

        controller.toggle_deletion("p2").unwrap();
        gate.notify_one();

        assert_eq!(commit.await.unwrap().unwrap(), 1);
        assert_eq!(controller.pending_delete_ids(), vec!["p2".to_string()]);
        assert_consistent(&controller);
    }

    #[tokio::test]
    async fn test_externally_deleted_photo_still_leaves_session() {
        let (library, controller) = loaded(undated(2)).await;
        controller.mark_delete().unwrap();
        library.remove_externally("p0");

        assert_eq!(controller.commit_deletion().await.unwrap(), 1);
        assert_eq!(ids(&controller.records()), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_current_image_loads() {
        let (_library, controller) = loaded(undated(2)).await;
        let loaded = controller
            .load_current_image(TargetSize::new(6, 4))
            .await
            .unwrap();
        assert_eq!(loaded.id, "p0");
        assert_eq!(loaded.image.dimensions(), (6, 4));
    }

    #[tokio::test]
    async fn test_stale_image_is_discarded() {
        let (library, controller) = loaded(undated(2)).await;
        let gate = library.hold_images();

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.load_current_image(TargetSize::new(2, 2)).await }
        });

        // Let the load pick up p0, then move on before its image arrives.
        tokio::task::yield_now().await;
        controller.mark_keep().unwrap();
        gate.notify_one();

        assert!(pending.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_image_for_grid() {
        let (_library, controller) = loaded(undated(2)).await;
        assert!(controller.load_image("p1", TargetSize::new(2, 2)).await.is_some());
        assert!(controller.load_image("zz", TargetSize::new(2, 2)).await.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (_library, controller) = loaded(undated(3)).await;
        let mut rx = controller.subscribe();

        controller.mark_keep().unwrap();
        controller.mark_delete().unwrap();

        assert!(rx.has_changed().unwrap());
        let summary = rx.borrow_and_update().clone();
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.pending_delete, 1);
        assert_eq!(summary.cursor, 2);
        assert_eq!(summary.current_id.as_deref(), Some("p2"));
    }
}
