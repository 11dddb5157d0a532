//! Photo library capability.
//!
//! The review controller never talks to storage directly. Everything it needs
//! from the outside world (permission, listing, pixels, deletion) goes through
//! the [`PhotoLibrary`] trait so it can run against a real folder on disk or
//! against the in-memory fake used in tests.

pub mod catalog;
pub mod error;
pub mod folder;
pub mod memory;
pub mod render;
pub mod scan;

use async_trait::async_trait;
use image::DynamicImage;

use crate::state::AssetInfo;

pub use error::LibraryError;
pub use folder::FolderLibrary;
pub use memory::InMemoryLibrary;

/// Outcome of asking for access to the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Authorized,
    /// Access to a subset of the library; still usable.
    Limited,
    Denied,
    Restricted,
    NotDetermined,
}

/// Size a photo should be scaled to for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Trait for photo library operations.
///
/// This trait is object-safe and can be used with `Arc<dyn PhotoLibrary>` for
/// shared access across async tasks.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Ask for (or report already granted) access to the library.
    async fn request_access(&self) -> AccessStatus;

    /// List every still image, newest first. Undated photos come last.
    async fn list_all_photos(&self) -> Result<Vec<AssetInfo>, LibraryError>;

    /// Decode `id` scaled to fill `size`.
    ///
    /// Returns `None` when the photo is gone or cannot be decoded.
    async fn load_image(&self, id: &str, size: TargetSize) -> Option<DynamicImage>;

    /// Remove `ids` from the library as one unit.
    ///
    /// Ids that no longer resolve (already removed elsewhere) are skipped
    /// silently. Either every resolved photo is removed or none is.
    async fn delete_assets(&self, ids: &[String]) -> Result<(), LibraryError>;
}
