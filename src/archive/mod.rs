//! Zip extraction with double-wrap detection.
//!
//! Upstream build artifacts are sometimes packaged with a redundant top-level
//! wrapper directory (the "double-wrapped" archive): the real payload sits one
//! directory deeper than expected. [`extract_archive`] detects that shape and
//! strips the wrapper so destination layouts stay stable regardless of how the
//! artifact was packaged.
//!
//! # Heuristic limitation
//!
//! Wrapper detection looks at the set of distinct first path segments across
//! all file entries. Exactly one distinct segment is treated as a wrapper and
//! stripped; two or more means the entries are extracted verbatim. An archive
//! whose real payload legitimately is a single top-level directory (say, one
//! asset folder shipped as the whole build) is indistinguishable from a
//! double-wrapped one and will have that directory stripped. Upstream
//! artifacts have always tolerated either shape, so the heuristic is kept
//! as-is; callers must treat extraction as a full overwrite of the
//! destination either way.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::core::LauncherError;

/// Extract zip-format bytes into `dest`, stripping a single redundant
/// top-level wrapper directory if one is detected.
///
/// Directory-only entries are skipped; parent directories are created as
/// needed. Malformed archive data maps to [`LauncherError::CorruptArchive`];
/// write failures propagate as IO errors and may leave `dest` partially
/// written. Callers wanting transactional behavior must back up `dest` first.
///
/// This is synchronous; async callers should run it inside
/// `tokio::task::spawn_blocking`.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<(), LauncherError> {
    extract_from_reader(Cursor::new(bytes), dest)
}

/// Extract a zip archive already staged on disk (streamed downloads).
///
/// Same semantics as [`extract_archive`], reading directly from the file
/// instead of an in-memory buffer.
pub fn extract_archive_file(archive_path: &Path, dest: &Path) -> Result<(), LauncherError> {
    let file = std::fs::File::open(archive_path)?;
    extract_from_reader(file, dest)
}

fn extract_from_reader<R: Read + Seek>(reader: R, dest: &Path) -> Result<(), LauncherError> {
    let mut archive = ZipArchive::new(reader).map_err(|e| LauncherError::CorruptArchive {
        reason: e.to_string(),
    })?;

    let strip_wrapper = detect_wrapper(&mut archive)?;
    if strip_wrapper {
        debug!("Archive has a single top-level wrapper directory; stripping it");
    }

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| LauncherError::CorruptArchive {
            reason: e.to_string(),
        })?;

        if entry.is_dir() {
            continue;
        }

        // enclosed_name rejects absolute paths and `..` traversal
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };

        let relative =
            if strip_wrapper { strip_first_segment(&relative) } else { relative };

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}

/// Decide whether the archive carries a redundant wrapper directory.
///
/// True when all file entries share exactly one distinct first path segment
/// and every entry has at least one further segment below it. A lone file at
/// the archive root never counts as a wrapper.
fn detect_wrapper<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<bool, LauncherError> {
    let mut first_segments: HashSet<PathBuf> = HashSet::new();
    let mut any_file = false;
    let mut all_nested = true;

    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(|e| LauncherError::CorruptArchive {
            reason: e.to_string(),
        })?;

        if entry.is_dir() {
            continue;
        }
        any_file = true;

        let Some(path) = entry.enclosed_name() else {
            continue;
        };

        let mut components = path.components();
        if let Some(Component::Normal(first)) = components.next() {
            first_segments.insert(PathBuf::from(first));
        }
        if components.next().is_none() {
            all_nested = false;
        }
    }

    Ok(any_file && all_nested && first_segments.len() == 1)
}

fn strip_first_segment(path: &Path) -> PathBuf {
    let mut components = path.components();
    components.next();
    components.as_path().to_path_buf()
}
