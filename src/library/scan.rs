//! Folder scanning: find still images and work out when they were taken.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use walkdir::{DirEntry, WalkDir};

use super::catalog::ScannedPhoto;

/// Still image extensions (common formats plus camera RAW)
pub const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "heif", "avif",
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2",
    "pef", "srw", "erf", "kdc", "dcr", "mos", "raw", "rwl",
];

/// Check if this is a still image by extension
pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            PHOTO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Walk `root` recursively and collect every still image.
///
/// `skip` names a directory (usually the trash) that is not descended into.
/// It is matched after resolving symlinks and relative components, so any
/// spelling of the same directory is skipped.
pub fn scan_folder(root: &Path, skip: Option<&Path>) -> Vec<ScannedPhoto> {
    let mut found = Vec::new();
    let skip = skip.and_then(|dir| fs::canonicalize(dir).ok());

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_skipped(e, skip.as_deref()))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Only process files (not directories)
        if !entry.file_type().is_file() || !is_photo(path) {
            continue;
        }

        let filename = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        found.push(ScannedPhoto {
            path: path.to_path_buf(),
            filename,
            created_at: capture_date(path),
        });
    }

    tracing::debug!("Scanned {}: {} photos", root.display(), found.len());
    found
}

fn is_skipped(entry: &DirEntry, skip: Option<&Path>) -> bool {
    let Some(skip) = skip else {
        return false;
    };
    entry.file_type().is_dir()
        && fs::canonicalize(entry.path()).is_ok_and(|resolved| resolved == skip)
}

/// When the photo was taken.
///
/// Prefers the EXIF `DateTimeOriginal` tag (camera wall-clock time, read as
/// local time) and falls back to the file's creation or modification time.
pub fn capture_date(path: &Path) -> Option<DateTime<Utc>> {
    exif_date(path).or_else(|| file_date(path))
}

fn exif_date(path: &Path) -> Option<DateTime<Utc>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(&file);

    let exif_data = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(data) => data,
        Err(e) => {
            tracing::trace!("No EXIF data in {}: {}", path.display(), e);
            return None;
        }
    };

    let field = exif_data.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let exif::Value::Ascii(ref values) = field.value else {
        return None;
    };
    let text = std::str::from_utf8(values.first()?).ok()?;
    parse_exif_datetime(text)
}

/// Parse the `YYYY:MM:DD HH:MM:SS` form used by EXIF, as local time
pub fn parse_exif_datetime(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), "%Y:%m:%d %H:%M:%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn file_date(path: &Path) -> Option<DateTime<Utc>> {
    let meta = std::fs::metadata(path).ok()?;
    meta.created()
        .or_else(|_| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}
