//! Display-size image loading
//! Decodes a photo from disk and scales it to fill the requested size

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage};

use super::error::LibraryError;
use super::TargetSize;

/// Decode and scale a photo on the blocking pool
pub async fn load_scaled(path: PathBuf, size: TargetSize) -> Result<DynamicImage, LibraryError> {
    // Spawn blocking task for CPU-bound work
    tokio::task::spawn_blocking(move || load_scaled_blocking(&path, size)).await?
}

/// Blocking version of image loading
pub fn load_scaled_blocking(path: &Path, size: TargetSize) -> Result<DynamicImage, LibraryError> {
    if !path.exists() {
        return Err(LibraryError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "photo file does not exist"),
        ));
    }

    let img = image::open(path)?;

    // Crop to the target aspect ratio, like a full-screen card
    let width = size.width.max(1);
    let height = size.height.max(1);
    Ok(img.resize_to_fill(width, height, FilterType::Lanczos3))
}
