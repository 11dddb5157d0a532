//! Error types for the photo library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while listing, rendering or deleting photos.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Failed to open or create the catalog database.
    #[error("Failed to open catalog at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A catalog query failed.
    #[error("Catalog query failed: {0}")]
    Catalog(#[from] rusqlite::Error),

    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A photo could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Failed to run a blocking task.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The configured library root is not a directory.
    #[error("Library root {0} is not a directory")]
    NotADirectory(PathBuf),

    /// Some files were moved before a failure and could not be put back.
    #[error("Deletion failed ({cause}); {stranded} file(s) left in the trash directory")]
    Rollback { cause: String, stranded: usize },

    /// The catalog mutex was poisoned by a panicking thread.
    #[error("Catalog lock poisoned")]
    Poisoned,

    /// The library refused the request.
    #[error("{0}")]
    Rejected(String),
}

impl LibraryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
