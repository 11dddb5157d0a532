use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;

use super::catalog::{Catalog, CatalogEntry, SyncStats};
use super::error::LibraryError;
use super::{render, scan, AccessStatus, PhotoLibrary, TargetSize};
use crate::state::AssetInfo;

/// A photo library backed by a folder on disk.
///
/// Files are indexed into a SQLite [`Catalog`] so each photo keeps the same id
/// between scans. Deleting moves files into `trash_dir` ("Recently Deleted"),
/// from where the user can still restore them by hand.
pub struct FolderLibrary {
    root: PathBuf,
    trash_dir: PathBuf,
    catalog: Arc<Catalog>,
}

impl FolderLibrary {
    /// Open the library at `root`, with its catalog database at `catalog_path`.
    pub fn open(root: &Path, catalog_path: &Path, trash_dir: &Path) -> Result<Self, LibraryError> {
        let catalog = Catalog::open(catalog_path)?;
        Ok(Self::with_catalog(root, catalog, trash_dir))
    }

    pub fn with_catalog(root: &Path, catalog: Catalog, trash_dir: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            trash_dir: trash_dir.to_path_buf(),
            catalog: Arc::new(catalog),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// File name of every present photo, keyed by id
    pub async fn file_names(&self) -> Result<HashMap<String, String>, LibraryError> {
        let catalog = Arc::clone(&self.catalog);
        let entries = tokio::task::spawn_blocking(move || catalog.list_existing()).await??;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let name = entry.path.file_name().unwrap_or_default().to_string_lossy().into_owned();
                (entry.id.to_string(), name)
            })
            .collect())
    }

    /// Rescan the folder and reconcile the catalog with what is on disk
    pub async fn refresh(&self) -> Result<SyncStats, LibraryError> {
        let root = self.root.clone();
        let trash_dir = self.trash_dir.clone();
        let catalog = Arc::clone(&self.catalog);

        tokio::task::spawn_blocking(move || {
            if !root.is_dir() {
                return Err(LibraryError::NotADirectory(root));
            }
            let scanned = scan::scan_folder(&root, Some(&trash_dir));
            catalog.sync(&scanned)
        })
        .await?
    }
}

impl std::fmt::Debug for FolderLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderLibrary")
            .field("root", &self.root)
            .field("trash_dir", &self.trash_dir)
            .field("catalog", &self.catalog.path())
            .finish()
    }
}

#[async_trait]
impl PhotoLibrary for FolderLibrary {
    async fn request_access(&self) -> AccessStatus {
        let root = self.root.clone();
        match tokio::task::spawn_blocking(move || probe_access(&root)).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Access probe failed: {}", e);
                AccessStatus::NotDetermined
            }
        }
    }

    async fn list_all_photos(&self) -> Result<Vec<AssetInfo>, LibraryError> {
        let stats = self.refresh().await?;
        if stats.added > 0 || stats.missing > 0 || stats.reappeared > 0 {
            tracing::info!(
                added = stats.added,
                missing = stats.missing,
                reappeared = stats.reappeared,
                "Catalog updated"
            );
        }

        let catalog = Arc::clone(&self.catalog);
        let entries = tokio::task::spawn_blocking(move || catalog.list_existing()).await??;
        Ok(entries.iter().map(CatalogEntry::asset_info).collect())
    }

    async fn load_image(&self, id: &str, size: TargetSize) -> Option<DynamicImage> {
        let catalog = Arc::clone(&self.catalog);
        let lookup = id.to_string();
        let path = match tokio::task::spawn_blocking(move || catalog.path_for(&lookup)).await {
            Ok(Ok(Some(path))) => path,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                tracing::warn!("Catalog lookup for {} failed: {}", id, e);
                return None;
            }
            Err(e) => {
                tracing::warn!("Catalog lookup for {} failed: {}", id, e);
                return None;
            }
        };

        match render::load_scaled(path, size).await {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::debug!("Could not load photo {}: {}", id, e);
                None
            }
        }
    }

    async fn delete_assets(&self, ids: &[String]) -> Result<(), LibraryError> {
        let catalog = Arc::clone(&self.catalog);
        let trash_dir = self.trash_dir.clone();
        let ids = ids.to_vec();

        tokio::task::spawn_blocking(move || move_to_trash(&catalog, &trash_dir, &ids)).await?
    }
}

/// Work out what the current process may do with the library folder.
fn probe_access(root: &Path) -> AccessStatus {
    let meta = match fs::metadata(root) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return AccessStatus::NotDetermined,
        Err(_) => return AccessStatus::Denied,
    };
    if !meta.is_dir() {
        return AccessStatus::NotDetermined;
    }
    if fs::read_dir(root).is_err() {
        return AccessStatus::Denied;
    }
    if meta.permissions().readonly() {
        return AccessStatus::Restricted;
    }
    AccessStatus::Authorized
}

/// Move every resolvable photo into the trash, all or nothing.
fn move_to_trash(catalog: &Catalog, trash_dir: &Path, ids: &[String]) -> Result<(), LibraryError> {
    move_to_trash_with(catalog, trash_dir, ids, &mut move_file)
}

/// Moves one file from the first path to the second.
type Mover<'a> = dyn FnMut(&Path, &Path) -> Result<(), LibraryError> + 'a;

fn move_to_trash_with(
    catalog: &Catalog,
    trash_dir: &Path,
    ids: &[String],
    mover: &mut Mover<'_>,
) -> Result<(), LibraryError> {
    let mut entries = catalog.resolve(ids)?;
    // Files removed behind our back count as already deleted.
    entries.retain(|entry| {
        let present = entry.path.exists();
        if !present {
            tracing::debug!("Skipping {}: file already gone", entry.path.display());
        }
        present
    });

    if entries.is_empty() {
        return Ok(());
    }

    fs::create_dir_all(trash_dir).map_err(|e| LibraryError::io(trash_dir, e))?;

    let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let dest = trash_path(trash_dir, entry);
        if let Err(e) = mover(&entry.path, &dest) {
            return Err(roll_back(&moved, e, mover));
        }
        moved.push((entry.path.clone(), dest));
    }

    let row_ids: Vec<i64> = entries.iter().map(|entry| entry.id).collect();
    if let Err(e) = catalog.mark_deleted(&row_ids) {
        return Err(roll_back(&moved, e, mover));
    }

    tracing::info!("🗑️  Moved {} photo(s) to {}", moved.len(), trash_dir.display());
    Ok(())
}

/// A free trash file name: `{id}-{filename}`, with a counter before the
/// extension when that name is taken.
///
/// Ids come back when a new file appears at a deleted photo's path, so the
/// plain name can already hold an earlier deletion.
fn trash_path(trash_dir: &Path, entry: &CatalogEntry) -> PathBuf {
    let filename = entry.path.file_name().unwrap_or_default();
    let plain = trash_dir.join(format!("{}-{}", entry.id, filename.to_string_lossy()));
    if !occupied(&plain) {
        return plain;
    }

    let name = Path::new(filename);
    let stem = name.file_stem().unwrap_or_default().to_string_lossy();
    let ext = name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (2u32..)
        .map(|n| trash_dir.join(format!("{}-{}-{}{}", entry.id, stem, n, ext)))
        .find(|candidate| !occupied(candidate))
        .unwrap_or(plain)
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Rename, falling back to copy + remove across filesystems.
///
/// Refuses to replace anything already at `to`.
fn move_file(from: &Path, to: &Path) -> Result<(), LibraryError> {
    if occupied(to) {
        return Err(LibraryError::io(
            to,
            std::io::Error::new(ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| LibraryError::io(from, e))?;
    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(LibraryError::io(from, e));
    }
    Ok(())
}

/// Put already-moved files back after `cause` interrupted a deletion.
fn roll_back(
    moved: &[(PathBuf, PathBuf)],
    cause: LibraryError,
    mover: &mut Mover<'_>,
) -> LibraryError {
    let mut stranded = 0;
    for (original, trashed) in moved.iter().rev() {
        if let Err(e) = mover(trashed, original) {
            tracing::error!(
                "Could not restore {} to {}: {}",
                trashed.display(),
                original.display(),
                e
            );
            stranded += 1;
        }
    }

    if stranded == 0 {
        tracing::warn!("Deletion rolled back: {}", cause);
        cause
    } else {
        LibraryError::Rollback {
            cause: cause.to_string(),
            stranded,
        }
    }
}
