//! Mod catalog and installed-mod reconciliation.
//!
//! The catalog is a static mapping from human-readable mod names to download
//! URLs; it is read-only at runtime. [`ModSynchronizer`] reconciles the files
//! under `<root>/Mods/` against a desired mod list: missing desired mods are
//! downloaded and installed, stale catalog mods are removed, and everything
//! the catalog does not know about is left strictly alone so manually
//! installed or third-party files are never deleted.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use crate::core::LauncherError;
use crate::fetch::ArtifactFetcher;

/// Subdirectory of the installation root that holds managed mod files.
pub const MODS_DIR: &str = "Mods";

/// File extension marking a managed mod artifact.
const MOD_EXTENSION: &str = "dll";

/// Static mapping from mod name to download URL.
///
/// At most one URL per name; iteration order is stable (sorted by name) so
/// log output and sync order are deterministic.
#[derive(Debug, Clone)]
pub struct ModCatalog {
    entries: BTreeMap<String, String>,
}

impl Default for ModCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModCatalog {
    /// The built-in catalog of known mods.
    pub fn builtin() -> Self {
        let entries = [
            (
                "Example",
                "https://github.com/modlauncher-mods/example-mod/releases/download/v0.1.0/Example.dll",
            ),
            (
                "CoreMod",
                "https://github.com/modlauncher-mods/core-mod/releases/download/v0.2.1/CoreMod.dll",
            ),
            (
                "ResetDomino",
                "https://github.com/modlauncher-mods/reset-domino/releases/download/v0.1.3/ResetDomino.dll",
            ),
        ]
        .into_iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect();
        Self { entries }
    }

    /// Build a catalog from explicit entries. Used by tests and callers that
    /// override the built-in list.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Look up the download URL for a mod name.
    pub fn url(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Whether the catalog knows this mod name.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All catalog mod names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Reject any desired name the catalog does not know.
    ///
    /// Used by the CLI before any work starts, so a typo fails the run
    /// upfront instead of surfacing as a mid-sync warning.
    pub fn validate(&self, desired: &[String]) -> Result<(), LauncherError> {
        for name in desired {
            if !self.contains(name) {
                return Err(LauncherError::UnknownMod { name: name.clone() });
            }
        }
        Ok(())
    }
}

/// Running tally of what a sync pass has changed on disk so far.
///
/// Filled in as each mod is installed or removed, so it stays accurate even
/// when the pass aborts partway through. The update pipeline consults it to
/// decide whether a failed run left the root dirty.
#[derive(Debug, Default)]
pub struct SyncProgress {
    /// Mods downloaded and written during this pass
    pub installed: usize,
    /// Stale catalog mods deleted during this pass
    pub removed: usize,
}

impl SyncProgress {
    /// Whether the pass has mutated the `Mods/` directory.
    pub const fn any_changes(&self) -> bool {
        self.installed > 0 || self.removed > 0
    }
}

/// Reconciles the `Mods/` directory against a desired mod list.
pub struct ModSynchronizer<'a> {
    fetcher: &'a ArtifactFetcher,
    catalog: &'a ModCatalog,
}

impl<'a> ModSynchronizer<'a> {
    /// Create a synchronizer borrowing the shared fetcher and catalog.
    pub fn new(fetcher: &'a ArtifactFetcher, catalog: &'a ModCatalog) -> Self {
        Self { fetcher, catalog }
    }

    /// Reconcile installed mods under `root` against `desired`.
    ///
    /// Installs (or overwrites) `<root>/Mods/<name>.dll` for every desired
    /// name present in the catalog; unknown names are logged as warnings and
    /// skipped. Afterwards removes any `.dll` under `Mods/` whose base name
    /// is a catalog entry but not in `desired`. Files the catalog does not
    /// recognize are never touched, whatever their extension.
    ///
    /// `progress` is updated as each install or removal lands on disk, so on
    /// failure it reflects exactly what has been written up to that point.
    pub async fn sync(
        &self,
        desired: &[String],
        root: &Path,
        progress: &mut SyncProgress,
    ) -> Result<(), LauncherError> {
        let mods_dir = root.join(MODS_DIR);
        tokio::fs::create_dir_all(&mods_dir).await?;

        for name in desired {
            let Some(url) = self.catalog.url(name) else {
                warn!("Mod '{name}' not found in the catalog; skipping");
                continue;
            };

            let payload = self.fetcher.fetch_bytes(url).await?;
            let mod_path = mods_dir.join(format!("{name}.{MOD_EXTENSION}"));
            tokio::fs::write(&mod_path, &payload).await?;
            progress.installed += 1;
            info!("Installed mod '{name}'");
        }

        self.remove_stale(desired, &mods_dir, progress).await
    }

    /// Delete catalog mods on disk that are no longer desired.
    async fn remove_stale(
        &self,
        desired: &[String],
        mods_dir: &Path,
        progress: &mut SyncProgress,
    ) -> Result<(), LauncherError> {
        let mut dir = tokio::fs::read_dir(mods_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_mod_file =
                path.extension().and_then(|e| e.to_str()) == Some(MOD_EXTENSION);
            if !is_mod_file {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
            else {
                continue;
            };

            if self.catalog.contains(&name) && !desired.iter().any(|d| d == &name) {
                tokio::fs::remove_file(&path).await?;
                progress.removed += 1;
                info!("Removed stale mod '{name}'");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// One-shot HTTP listener that answers every request with `body`.
    async fn serve_body(body: &'static [u8], requests: usize) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..requests {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let header =
                    format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n", body.len());
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(body).await;
            }
        });
        format!("http://{addr}/mod.dll")
    }

    #[tokio::test]
    async fn reconciles_installed_mods_against_desired_list() {
        let url = serve_body(b"fresh mod payload", 1).await;
        let catalog =
            ModCatalog::from_entries([("A", url.clone()), ("B", url.clone())]);
        let fetcher = ArtifactFetcher::new();
        let sync = ModSynchronizer::new(&fetcher, &catalog);

        let root = TempDir::new().unwrap();
        let mods_dir = root.path().join(MODS_DIR);
        std::fs::create_dir_all(&mods_dir).unwrap();
        std::fs::write(mods_dir.join("A.dll"), b"stale catalog mod").unwrap();
        std::fs::write(mods_dir.join("C.dll"), b"third-party mod").unwrap();

        let mut progress = SyncProgress::default();
        sync.sync(&["B".to_string()], root.path(), &mut progress).await.unwrap();

        assert!(!mods_dir.join("A.dll").exists(), "stale catalog mod must be removed");
        assert!(mods_dir.join("B.dll").exists(), "desired mod must be installed");
        assert!(mods_dir.join("C.dll").exists(), "non-catalog file must be untouched");
        assert_eq!(progress.installed, 1);
        assert_eq!(progress.removed, 1);
    }

    #[tokio::test]
    async fn unknown_desired_names_are_skipped() {
        let catalog = ModCatalog::from_entries([("A", "http://127.0.0.1:9/never")]);
        let fetcher = ArtifactFetcher::new();
        let sync = ModSynchronizer::new(&fetcher, &catalog);

        let root = TempDir::new().unwrap();
        // No fetch happens for an unknown name, so this must succeed offline
        let mut progress = SyncProgress::default();
        sync.sync(&["NotInCatalog".to_string()], root.path(), &mut progress).await.unwrap();
        assert!(root.path().join(MODS_DIR).exists());
        assert!(!progress.any_changes());
    }

    #[tokio::test]
    async fn non_dll_files_are_never_deleted() {
        let catalog = ModCatalog::from_entries([("A", "http://127.0.0.1:9/never")]);
        let fetcher = ArtifactFetcher::new();
        let sync = ModSynchronizer::new(&fetcher, &catalog);

        let root = TempDir::new().unwrap();
        let mods_dir = root.path().join(MODS_DIR);
        std::fs::create_dir_all(&mods_dir).unwrap();
        // Same base name as a catalog entry, but not a managed extension
        std::fs::write(mods_dir.join("A.txt"), b"notes").unwrap();

        let mut progress = SyncProgress::default();
        sync.sync(&[], root.path(), &mut progress).await.unwrap();
        assert!(mods_dir.join("A.txt").exists());
        assert_eq!(progress.removed, 0);
    }

    #[tokio::test]
    async fn partial_failure_reports_writes_so_far() {
        let good_url = serve_body(b"payload A", 1).await;

        // Second catalog entry always answers 500
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let bad_url = format!("http://{}/mod.dll", listener.local_addr().unwrap());
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n",
                    )
                    .await;
            }
        });

        let catalog = ModCatalog::from_entries([("A", good_url), ("B", bad_url)]);
        let fetcher = ArtifactFetcher::new();
        let sync = ModSynchronizer::new(&fetcher, &catalog);

        let root = TempDir::new().unwrap();
        let mut progress = SyncProgress::default();
        let err = sync
            .sync(&["A".to_string(), "B".to_string()], root.path(), &mut progress)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::FetchFailure { status: 500, .. }));
        assert_eq!(progress.installed, 1, "the write that landed must be reported");
        assert!(progress.any_changes());
        assert!(root.path().join(MODS_DIR).join("A.dll").exists());
    }

    #[test]
    fn validate_rejects_unknown_names() {
        let catalog = ModCatalog::from_entries([("A", "http://example.com/a.dll")]);
        let err = catalog.validate(&["A".to_string(), "Z".to_string()]).unwrap_err();
        assert!(matches!(err, LauncherError::UnknownMod { name } if name == "Z"));
        assert!(catalog.validate(&["A".to_string()]).is_ok());
    }

    #[test]
    fn builtin_catalog_is_stable_and_nonempty() {
        let catalog = ModCatalog::builtin();
        let names: Vec<_> = catalog.names().collect();
        assert!(!names.is_empty());
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(catalog.url(names[0]).is_some());
    }
}
