/// Shared data structures for the review state
///
/// These structs represent the data model that flows between
/// the photo library, the review session and the presentation layer.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// Review decision recorded for a single photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// No decision yet (or a pending deletion was toggled off)
    #[default]
    Unreviewed,
    /// The user chose to keep the photo
    Kept,
    /// The photo will be removed on the next committed deletion
    PendingDelete,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreviewed => "unreviewed",
            Self::Kept => "kept",
            Self::PendingDelete => "pending_delete",
        }
    }
}

/// Facets of an asset supplied by the photo library.
///
/// The library never knows about review decisions; those live only on
/// [`PhotoRecord`] inside the review session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    /// Stable library identifier
    pub id: String,
    /// When the photo was taken, if the library knows
    pub creation_date: Option<DateTime<Utc>>,
}

impl AssetInfo {
    pub fn new(id: impl Into<String>, creation_date: Option<DateTime<Utc>>) -> Self {
        Self { id: id.into(), creation_date }
    }
}

/// Represents a single photo in the review session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoRecord {
    /// Stable library identifier (opaque)
    pub id: String,
    /// Creation timestamp, used for same-day grouping
    pub creation_date: Option<DateTime<Utc>>,
    /// Current review decision
    pub review_state: ReviewState,
    /// Set when a kept photo was toggled into pending deletion,
    /// so a restoring toggle policy can bring the decision back.
    #[serde(skip)]
    pub(crate) kept_before_toggle: bool,
}

impl PhotoRecord {
    pub fn new(id: impl Into<String>, creation_date: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            creation_date,
            review_state: ReviewState::Unreviewed,
            kept_before_toggle: false,
        }
    }

    pub fn is_pending_delete(&self) -> bool {
        self.review_state == ReviewState::PendingDelete
    }

    pub fn is_kept(&self) -> bool {
        self.review_state == ReviewState::Kept
    }

    /// True when both photos carry a date and those dates fall on the
    /// same calendar day in the local timezone.
    pub fn is_same_day(&self, other: &PhotoRecord) -> bool {
        match (self.creation_date, other.creation_date) {
            (Some(a), Some(b)) => same_local_day(a, b),
            _ => false,
        }
    }
}

impl From<AssetInfo> for PhotoRecord {
    fn from(asset: AssetInfo) -> Self {
        Self::new(asset.id, asset.creation_date)
    }
}

pub(crate) fn same_local_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.with_timezone(&Local).date_naive() == b.with_timezone(&Local).date_naive()
}

/// Photos taken on the same day as a reference photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedGroup {
    /// Local calendar day, `YYYY-MM-DD`
    pub id: String,
    /// Human readable heading, e.g. "Sunday, March 3, 2024"
    pub title: String,
    pub photos: Vec<PhotoRecord>,
}

/// Snapshot of the session published to observers after every change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub total: usize,
    /// Cursor position; 0 when the session is empty
    pub cursor: usize,
    pub current_id: Option<String>,
    pub pending_delete: usize,
    pub kept: usize,
    pub is_loading: bool,
    pub deletion_in_progress: bool,
    /// Message of the last load failure, if any
    pub load_error: Option<String>,
}

impl SessionSummary {
    /// "Photo X of N", or `None` when there is nothing left to show
    pub fn progress(&self) -> Option<String> {
        self.current_id
            .as_ref()
            .map(|_| format!("Photo {} of {}", self.cursor + 1, self.total))
    }
}
