use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::LibraryError;
use crate::state::AssetInfo;

/// Where a catalogued file currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Present in the library folder.
    Exists,
    /// Vanished from disk without going through this catalog.
    Missing,
    /// Moved to the trash directory by a committed deletion.
    Deleted,
}

impl FileStatus {
    /// Convert to the string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Missing => "missing",
            Self::Deleted => "deleted",
        }
    }

    /// Parse from the string stored in the database.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "exists" => Some(Self::Exists),
            "missing" => Some(Self::Missing),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A photo file found while scanning the library folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPhoto {
    pub path: PathBuf,
    pub filename: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// One row of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    /// The facets the review session sees
    pub fn asset_info(&self) -> AssetInfo {
        AssetInfo::new(self.id.to_string(), self.created_at)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let path: String = row.get(1)?;
        let created_at: Option<i64> = row.get(2)?;
        Ok(Self {
            id: row.get(0)?,
            path: PathBuf::from(path),
            created_at: created_at.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

/// Result of reconciling the catalog with a folder scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub added: usize,
    /// Rows that were missing or deleted and showed up on disk again
    pub reappeared: usize,
    pub missing: usize,
}

/// The Catalog manages the SQLite database behind a folder library.
///
/// It gives every photo file a stable id (the row id, keyed by path), so ids
/// survive rescans and restarts. Review decisions are never stored here.
pub struct Catalog {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync.
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Catalog {
    /// Open or create the catalog at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
        }

        let conn = Connection::open(db_path).map_err(|e| LibraryError::Open {
            path: db_path.to_path_buf(),
            source: e,
        })?;
        Self::init_schema(&conn)?;

        tracing::debug!("Catalog opened at {}", db_path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Open a throwaway catalog that lives only in memory.
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory().map_err(|e| LibraryError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Create tables and indexes if they don't exist.
    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL UNIQUE,
                filename        TEXT NOT NULL,
                created_at      INTEGER,
                imported_at     INTEGER NOT NULL,
                file_status     TEXT NOT NULL DEFAULT 'exists'
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_created_at
             ON photos(created_at DESC)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_file_status
             ON photos(file_status)",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Count of photos currently present on disk
    pub fn photo_count(&self) -> Result<i64, LibraryError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE file_status = 'exists'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Reconcile the catalog with the files found by a scan.
    ///
    /// New paths get a fresh id, known paths keep theirs (and come back to
    /// `exists` if they had vanished), and present rows that were not seen
    /// are marked `missing`.
    pub fn sync(&self, scanned: &[ScannedPhoto]) -> Result<SyncStats, LibraryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stats = SyncStats::default();
        let now = Utc::now().timestamp();

        let mut seen: HashSet<String> = HashSet::with_capacity(scanned.len());
        for photo in scanned {
            let path = photo.path.to_string_lossy().to_string();
            let created_at = photo.created_at.map(|d| d.timestamp());

            let existing: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, file_status FROM photos WHERE path = ?1",
                    [&path],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match existing {
                None => {
                    tx.execute(
                        "INSERT INTO photos (path, filename, created_at, imported_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![path, photo.filename, created_at, now],
                    )?;
                    stats.added += 1;
                }
                Some((id, status)) => {
                    if FileStatus::from_str(&status) != Some(FileStatus::Exists) {
                        stats.reappeared += 1;
                    }
                    tx.execute(
                        "UPDATE photos SET created_at = ?1, file_status = 'exists' WHERE id = ?2",
                        params![created_at, id],
                    )?;
                }
            }
            seen.insert(path);
        }

        let present: Vec<(i64, String)> = {
            let mut stmt = tx.prepare("SELECT id, path FROM photos WHERE file_status = 'exists'")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        for (id, path) in present {
            if !seen.contains(&path) {
                tx.execute(
                    "UPDATE photos SET file_status = 'missing' WHERE id = ?1",
                    [id],
                )?;
                stats.missing += 1;
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    /// Photos present on disk, newest first, undated last
    pub fn list_existing(&self) -> Result<Vec<CatalogEntry>, LibraryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, path, created_at FROM photos
             WHERE file_status = 'exists'
             ORDER BY created_at IS NULL, created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], CatalogEntry::from_row)?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Look up the rows for `ids` that are still present.
    ///
    /// Ids that are malformed, unknown or already gone are skipped.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<CatalogEntry>, LibraryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, path, created_at FROM photos
             WHERE id = ?1 AND file_status = 'exists'",
        )?;

        let mut entries = Vec::with_capacity(ids.len());
        for raw in ids {
            let Ok(id) = raw.parse::<i64>() else {
                tracing::debug!("Skipping malformed photo id {:?}", raw);
                continue;
            };
            if let Some(entry) = stmt.query_row([id], CatalogEntry::from_row).optional()? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// File path of a present photo
    pub fn path_for(&self, id: &str) -> Result<Option<PathBuf>, LibraryError> {
        Ok(self
            .resolve(std::slice::from_ref(&id.to_string()))?
            .into_iter()
            .next()
            .map(|entry| entry.path))
    }

    /// Mark rows as moved to the trash, all in one transaction.
    pub fn mark_deleted(&self, ids: &[i64]) -> Result<(), LibraryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute(
                "UPDATE photos SET file_status = 'deleted' WHERE id = ?1",
                [id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LibraryError> {
        self.conn.lock().map_err(|_| LibraryError::Poisoned)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("db_path", &self.db_path)
            .finish()
    }
}
