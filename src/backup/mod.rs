//! Snapshot and restore of the installation root.
//!
//! Before the update pipeline performs any destructive write it can snapshot
//! the installation root into a single archive, `backup/game_backup.zip`,
//! kept inside the root itself. The archive represents the last known-good
//! state and is the only rollback mechanism the pipeline has: recovery is
//! post-hoc restore, not rollback-in-place.
//!
//! At most one backup exists per root. A backup attempt that collides with an
//! existing archive keeps the existing one (first-backup-wins), preserving
//! the oldest known-good state across repeated update attempts rather than
//! the most recent.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::core::LauncherError;

/// Name of the subdirectory under the installation root that holds the
/// backup archive. Excluded from snapshots to avoid self-inclusion.
pub const BACKUP_DIR: &str = "backup";

/// File name of the single backup archive.
pub const BACKUP_FILE: &str = "game_backup.zip";

/// Creates and restores snapshots of an installation root.
///
/// The snapshot is built in a scratch file next to its final location and
/// published with a single rename, so a failed backup never leaves a partial
/// archive visible and never deletes existing data.
pub struct BackupManager {
    root: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    /// Create a manager for the given installation root.
    ///
    /// The backup archive lives at `<root>/backup/game_backup.zip`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let backup_path = root.join(BACKUP_DIR).join(BACKUP_FILE);
        Self { root, backup_path }
    }

    /// Snapshot the installation root into the backup archive.
    ///
    /// Walks the root recursively, excluding the `backup/` subdirectory, and
    /// writes every file into a zip archive built in a scratch file. The
    /// final rename into place is the only mutation visible under the root.
    ///
    /// Returns `true` if a new backup was created, `false` if an existing
    /// backup was kept. An existing archive is never overwritten: the freshly
    /// built one is discarded so the oldest known-good snapshot survives
    /// repeated update attempts.
    pub async fn create_backup(&self) -> Result<bool, LauncherError> {
        let root = self.root.clone();
        let backup_path = self.backup_path.clone();
        tokio::task::spawn_blocking(move || create_backup_sync(&root, &backup_path))
            .await
            .map_err(|e| LauncherError::Io(std::io::Error::other(e)))?
    }

    /// Restore the installation root from the backup archive.
    ///
    /// Extracts the archive over the root, overwriting conflicting files.
    /// Entries are restored verbatim; the double-wrap heuristic in
    /// [`crate::archive`] applies only to upstream artifacts, never to
    /// archives we produced ourselves.
    ///
    /// A missing backup is not an error: returns `false` and logs the fact,
    /// since restore is invoked best-effort from failure paths.
    pub async fn restore_backup(&self) -> Result<bool, LauncherError> {
        if !self.backup_path.exists() {
            info!("No backup found at {}; nothing to restore", self.backup_path.display());
            return Ok(false);
        }

        let root = self.root.clone();
        let backup_path = self.backup_path.clone();
        tokio::task::spawn_blocking(move || restore_backup_sync(&root, &backup_path))
            .await
            .map_err(|e| LauncherError::Io(std::io::Error::other(e)))??;
        Ok(true)
    }

    /// Whether a backup archive currently exists for this root.
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Path of the backup archive.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}

fn create_backup_sync(root: &Path, backup_path: &Path) -> Result<bool, LauncherError> {
    let backup_dir = backup_path.parent().ok_or_else(|| LauncherError::NotFound {
        path: backup_path.display().to_string(),
    })?;
    std::fs::create_dir_all(backup_dir)?;

    // Scratch file sits next to the final path so the publish rename is
    // atomic on every platform.
    let scratch = backup_path.with_extension("zip.tmp");
    let result = build_archive(root, &scratch);

    if let Err(e) = result {
        let _ = std::fs::remove_file(&scratch);
        return Err(e);
    }

    if backup_path.exists() {
        warn!(
            "Backup already exists at {}; keeping the existing snapshot",
            backup_path.display()
        );
        std::fs::remove_file(&scratch)?;
        return Ok(false);
    }

    std::fs::rename(&scratch, backup_path)?;
    info!("Backup created at {}", backup_path.display());
    Ok(true)
}

fn build_archive(root: &Path, scratch: &Path) -> Result<(), LauncherError> {
    let file = std::fs::File::create(scratch)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(root).into_iter().filter_entry(|e| {
        // Skip the backup directory itself, including the scratch file
        !(e.depth() == 1 && e.file_name() == BACKUP_DIR)
    }) {
        let entry = entry.map_err(|e| LauncherError::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| LauncherError::Io(std::io::Error::other(e)))?;
        let name = relative.to_string_lossy().replace('\\', "/");

        debug!("Adding {name} to backup");
        writer.start_file(name, options)?;
        let mut source = std::fs::File::open(entry.path())?;
        std::io::copy(&mut source, &mut writer)?;
    }

    writer.finish()?.sync_all()?;
    Ok(())
}

fn restore_backup_sync(root: &Path, backup_path: &Path) -> Result<(), LauncherError> {
    let file = std::fs::File::open(backup_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| LauncherError::CorruptArchive {
        reason: e.to_string(),
    })?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| LauncherError::CorruptArchive {
            reason: e.to_string(),
        })?;
        if entry.is_dir() {
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping backup entry with unsafe path: {}", entry.name());
            continue;
        };

        let target = root.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        let mut out = std::fs::File::create(&target)?;
        out.write_all(&contents)?;
    }

    info!("Restored installation from {}", backup_path.display());
    Ok(())
}
