use thiserror::Error;

use crate::library::LibraryError;

/// Errors surfaced by the review controller.
///
/// None of them is fatal: after any of these the session is still consistent
/// and the user can retry.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// The user refused access to the photo library.
    #[error("Photo library access denied. Please enable access in Settings.")]
    AccessDenied,

    /// Access is blocked by a policy the user cannot change here.
    #[error("Photo library access is restricted.")]
    AccessRestricted,

    #[error("Photo library access not determined.")]
    AccessNotDetermined,

    /// Commit was requested with nothing marked for deletion.
    #[error("No photos selected for deletion")]
    EmptySelection,

    /// Another commit has not finished yet.
    #[error("A deletion is already in progress")]
    DeletionInProgress,

    /// The library refused the deletion; nothing was removed.
    #[error("Failed to delete photos: {0}")]
    DeletionFailed(String),

    /// Keep/delete with nothing under the cursor. Safe to ignore.
    #[error("No photo to review")]
    NoCurrentRecord,

    #[error("Photo {0} is not in this session")]
    UnknownPhoto(String),

    /// Listing the library failed while loading.
    #[error("Could not load photos: {0}")]
    Library(#[from] LibraryError),
}
