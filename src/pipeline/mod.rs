//! The update pipeline: fetch, backup, apply, recover.
//!
//! One pipeline run refreshes any combination of the four artifact kinds
//! (installer binary, game build, mod-loader build, mod files) against a
//! single installation root, in a fixed order:
//!
//! ```text
//! update-installer -> backup -> update-game -> update-mod-loader -> sync-mods
//! ```
//!
//! Every enabled step runs inside one recovery envelope. On any step failure
//! the pipeline logs the error, restores the backup if the configuration asks
//! for it and anything was written, and re-raises the original error. The
//! pipeline never partially succeeds silently.
//!
//! Archive steps extract over the installation root in place: stale files
//! from a previous version persist, since no deletions are performed. The
//! installer step only stages the replacement binary; the actual swap is the
//! out-of-process job of [`crate::swap`].
//!
//! Execution is strictly sequential. Concurrent runs against the same root
//! are not supported; callers serialize externally (one install session at a
//! time).

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::archive;
use crate::backup::BackupManager;
use crate::core::LauncherError;
use crate::fetch::ArtifactFetcher;
use crate::mods::{ModCatalog, ModSynchronizer, SyncProgress};
use crate::swap;

/// Fixed download URLs for the three non-mod artifact kinds.
#[derive(Debug, Clone)]
pub struct ArtifactUrls {
    /// The launcher/installer binary itself
    pub installer: String,
    /// Zip archive of the full game build
    pub game_build: String,
    /// Zip archive of the mod-loader build
    pub mod_loader_build: String,
}

impl Default for ArtifactUrls {
    fn default() -> Self {
        Self {
            installer: "https://github.com/modlauncher-mods/modlauncher/releases/latest/download/modlauncher.exe".to_string(),
            game_build: "https://github.com/modlauncher-mods/game-builds/releases/latest/download/game.zip".to_string(),
            mod_loader_build: "https://github.com/modlauncher-mods/mod-loader/releases/latest/download/modloader.zip".to_string(),
        }
    }
}

/// Which steps a pipeline run performs, and how it recovers.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Stage a fresh launcher binary for out-of-process replacement
    pub update_installer: bool,
    /// Snapshot the root before any destructive write
    pub backup_before_install: bool,
    /// Download and extract the game build over the root
    pub update_game: bool,
    /// Download and extract the mod-loader build over the root.
    ///
    /// Also runs implicitly whenever the game or installer was updated: a
    /// new build may require a matching mod-loader.
    pub update_mod_loader: bool,
    /// Reconcile installed mods against `mod_list`
    pub sync_mods: bool,
    /// Desired mod names for the sync step
    pub mod_list: Vec<String>,
    /// Restore the backup archive before re-raising a step failure
    pub restore_on_failure: bool,
}

/// What a pipeline run actually did. Returned on success; consulted on
/// failure to decide whether a restore is worthwhile.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// A staged launcher binary was written
    pub installer_staged: bool,
    /// A new backup archive was created (false also when an existing one was kept)
    pub backup_created: bool,
    /// The game build was extracted over the root
    pub game_updated: bool,
    /// The mod-loader build was extracted over the root
    pub mod_loader_updated: bool,
    /// The mod sync step ran to completion
    pub mods_synced: bool,
    /// The mod sync step wrote or deleted at least one mod file, even if it
    /// then failed partway through
    pub mods_written: bool,
}

impl PipelineReport {
    /// Whether any write to the installation root happened.
    pub const fn any_writes(&self) -> bool {
        self.installer_staged || self.game_updated || self.mod_loader_updated || self.mods_written
    }
}

/// Orchestrates one update run against an installation root.
pub struct UpdatePipeline {
    root: PathBuf,
    urls: ArtifactUrls,
    catalog: ModCatalog,
    fetcher: ArtifactFetcher,
}

impl UpdatePipeline {
    /// Pipeline for `root` using the given artifact URLs and mod catalog.
    pub fn new(root: impl Into<PathBuf>, urls: ArtifactUrls, catalog: ModCatalog) -> Self {
        Self { root: root.into(), urls, catalog, fetcher: ArtifactFetcher::new() }
    }

    /// Installation root this pipeline mutates.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the enabled steps under one recovery envelope.
    ///
    /// On failure the original error is always re-raised; restore is a side
    /// effect, not a substitute outcome. Restore itself is best-effort: a
    /// missing backup is informational, and a restore error is logged without
    /// masking the step error that triggered it.
    pub async fn run(&self, options: &UpdateOptions) -> Result<PipelineReport, LauncherError> {
        let mut report = PipelineReport::default();

        match self.run_steps(options, &mut report).await {
            Ok(()) => Ok(report),
            Err(step_error) => {
                error!("Update failed: {step_error}");

                if options.restore_on_failure {
                    // Fetch failures abort a step before it writes; if no
                    // earlier step wrote either, the root is untouched and a
                    // restore would add nothing.
                    if step_error.is_pre_write() && !report.any_writes() {
                        info!("Nothing was written; skipping restore");
                    } else if let Err(restore_error) =
                        BackupManager::new(&self.root).restore_backup().await
                    {
                        warn!("Backup restore failed: {restore_error}");
                    }
                }

                Err(step_error)
            }
        }
    }

    async fn run_steps(
        &self,
        options: &UpdateOptions,
        report: &mut PipelineReport,
    ) -> Result<(), LauncherError> {
        if options.update_installer {
            self.stage_installer(report).await?;
        }

        if options.backup_before_install {
            let manager = BackupManager::new(&self.root);
            report.backup_created = manager.create_backup().await?;
        }

        if options.update_game {
            self.extract_build(&self.urls.game_build, "game build").await?;
            report.game_updated = true;
        }

        // A new game or installer build may need a matching mod-loader build
        if options.update_mod_loader || report.game_updated || report.installer_staged {
            self.extract_build(&self.urls.mod_loader_build, "mod-loader build").await?;
            report.mod_loader_updated = true;
        }

        if options.sync_mods {
            let synchronizer = ModSynchronizer::new(&self.fetcher, &self.catalog);
            // Record partial writes before propagating a mid-sync failure, so
            // the recovery envelope knows the root is dirty.
            let mut progress = SyncProgress::default();
            let result = synchronizer.sync(&options.mod_list, &self.root, &mut progress).await;
            report.mods_written = progress.any_changes();
            result?;
            report.mods_synced = true;
        }

        Ok(())
    }

    /// Download the installer binary and stage it next to the live launcher.
    ///
    /// The staged file keeps its distinct `.new` name until the swap
    /// coordinator activates it; the live binary is never touched here.
    async fn stage_installer(&self, report: &mut PipelineReport) -> Result<(), LauncherError> {
        let payload = self.fetcher.fetch_bytes(&self.urls.installer).await?;
        let staged = self.root.join(swap::staged_launcher_file());
        tokio::fs::write(&staged, &payload).await?;
        report.installer_staged = true;
        info!("Staged launcher update at {}", staged.display());
        Ok(())
    }

    /// Download an archive build and extract it over the installation root.
    async fn extract_build(&self, url: &str, what: &str) -> Result<(), LauncherError> {
        info!("Updating {what}");
        let temp = self.fetcher.fetch_to_temp(url).await?;
        let archive_path = temp.path().to_path_buf();
        let dest = self.root.clone();

        tokio::task::spawn_blocking(move || archive::extract_archive_file(&archive_path, &dest))
            .await
            .map_err(|e| LauncherError::Io(std::io::Error::other(e)))??;

        info!("{what} extracted over {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BACKUP_DIR, BACKUP_FILE};
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut cursor);
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    /// Answer `requests` HTTP requests with the given body (or a 500 when
    /// `body` is `None`), whatever the path.
    async fn serve(body: Option<Vec<u8>>, requests: usize) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..requests {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                match &body {
                    Some(payload) => {
                        let header = format!(
                            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n",
                            payload.len()
                        );
                        let _ = socket.write_all(header.as_bytes()).await;
                        let _ = socket.write_all(payload).await;
                    }
                    None => {
                        let _ = socket
                            .write_all(
                                b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n",
                            )
                            .await;
                    }
                }
            }
        });
        format!("http://{addr}/artifact")
    }

    fn urls_with(game_build: String) -> ArtifactUrls {
        ArtifactUrls {
            installer: "http://127.0.0.1:9/unused".to_string(),
            game_build,
            mod_loader_build: "http://127.0.0.1:9/unused".to_string(),
        }
    }

    #[tokio::test]
    async fn game_update_extracts_over_root() {
        let archive = build_zip(&[("GameBuild/Game.exe", b"v2"), ("GameBuild/data/a.dat", b"a")]);
        let url = serve(Some(archive), 1).await;
        let loader = build_zip(&[("Loader/ModLoader.dll", b"loader")]);
        let loader_url = serve(Some(loader), 1).await;

        let root = TempDir::new().unwrap();
        let urls = ArtifactUrls {
            installer: "http://127.0.0.1:9/unused".to_string(),
            game_build: url,
            mod_loader_build: loader_url,
        };
        let pipeline = UpdatePipeline::new(root.path(), urls, ModCatalog::builtin());

        let options = UpdateOptions { update_game: true, ..Default::default() };
        let report = pipeline.run(&options).await.unwrap();

        assert!(report.game_updated);
        assert!(report.mod_loader_updated, "mod-loader follows a game update");
        assert_eq!(std::fs::read(root.path().join("Game.exe")).unwrap(), b"v2");
        assert!(root.path().join("ModLoader.dll").exists());
    }

    #[tokio::test]
    async fn failed_game_update_restores_backup() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("Game.exe"), b"known good").unwrap();

        // Corrupt archive bytes: fetch succeeds, extraction fails mid-step
        let url = serve(Some(b"not a zip archive".to_vec()), 1).await;
        let pipeline =
            UpdatePipeline::new(root.path(), urls_with(url), ModCatalog::builtin());

        let options = UpdateOptions {
            backup_before_install: true,
            update_game: true,
            restore_on_failure: true,
            ..Default::default()
        };

        let err = pipeline.run(&options).await.unwrap_err();
        assert!(matches!(err, LauncherError::CorruptArchive { .. }));

        // Root still matches the backup's file set
        assert_eq!(std::fs::read(root.path().join("Game.exe")).unwrap(), b"known good");
        assert!(root.path().join(BACKUP_DIR).join(BACKUP_FILE).exists());
    }

    #[tokio::test]
    async fn mid_run_failure_restores_already_written_files() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("Game.exe"), b"known good").unwrap();

        // Game build extracts fine, then the implicit mod-loader fetch fails
        let game_archive = build_zip(&[("GameBuild/Game.exe", b"freshly broken")]);
        let game_url = serve(Some(game_archive), 1).await;
        let loader_url = serve(None, 1).await;

        let urls = ArtifactUrls {
            installer: "http://127.0.0.1:9/unused".to_string(),
            game_build: game_url,
            mod_loader_build: loader_url,
        };
        let pipeline = UpdatePipeline::new(root.path(), urls, ModCatalog::builtin());

        let options = UpdateOptions {
            backup_before_install: true,
            update_game: true,
            restore_on_failure: true,
            ..Default::default()
        };
        let err = pipeline.run(&options).await.unwrap_err();

        assert!(matches!(err, LauncherError::FetchFailure { status: 500, .. }));
        // The half-applied game update was rolled back from the backup
        assert_eq!(std::fs::read(root.path().join("Game.exe")).unwrap(), b"known good");
    }

    #[tokio::test]
    async fn mid_sync_fetch_failure_restores_partial_mod_writes() {
        let root = TempDir::new().unwrap();
        let mods_dir = root.path().join(crate::mods::MODS_DIR);
        std::fs::create_dir_all(&mods_dir).unwrap();
        std::fs::write(mods_dir.join("A.dll"), b"known good A").unwrap();

        // Mod A downloads and lands on disk, then mod B's fetch fails
        let good_url = serve(Some(b"freshly broken A".to_vec()), 1).await;
        let bad_url = serve(None, 1).await;
        let catalog = ModCatalog::from_entries([("A", good_url), ("B", bad_url)]);

        let pipeline = UpdatePipeline::new(
            root.path(),
            urls_with("http://127.0.0.1:9/unused".to_string()),
            catalog,
        );
        let options = UpdateOptions {
            backup_before_install: true,
            sync_mods: true,
            mod_list: vec!["A".to_string(), "B".to_string()],
            restore_on_failure: true,
            ..Default::default()
        };

        let err = pipeline.run(&options).await.unwrap_err();
        assert!(matches!(err, LauncherError::FetchFailure { status: 500, .. }));

        // The half-applied sync was rolled back from the backup
        assert_eq!(std::fs::read(mods_dir.join("A.dll")).unwrap(), b"known good A");
    }

    #[tokio::test]
    async fn fetch_failure_before_any_write_skips_restore() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("Game.exe"), b"original").unwrap();

        let url = serve(None, 1).await;
        let pipeline =
            UpdatePipeline::new(root.path(), urls_with(url), ModCatalog::builtin());

        let options = UpdateOptions {
            update_game: true,
            restore_on_failure: true,
            ..Default::default()
        };
        let err = pipeline.run(&options).await.unwrap_err();

        assert!(matches!(err, LauncherError::FetchFailure { status: 500, .. }));
        // No backup existed and none was needed; the root is untouched
        assert_eq!(std::fs::read(root.path().join("Game.exe")).unwrap(), b"original");
        assert!(!root.path().join(BACKUP_DIR).join(BACKUP_FILE).exists());
    }

    #[tokio::test]
    async fn installer_update_stages_without_touching_live_binary() {
        let payload = b"new launcher binary".to_vec();
        let installer_url = serve(Some(payload), 1).await;
        let loader = build_zip(&[("ModLoader.dll", b"loader"), ("loader.cfg", b"cfg")]);
        let loader_url = serve(Some(loader), 1).await;

        let root = TempDir::new().unwrap();
        let live = root.path().join(crate::swap::launcher_file());
        std::fs::write(&live, b"current launcher").unwrap();

        let urls = ArtifactUrls {
            installer: installer_url,
            game_build: "http://127.0.0.1:9/unused".to_string(),
            mod_loader_build: loader_url,
        };
        let pipeline = UpdatePipeline::new(root.path(), urls, ModCatalog::builtin());

        let options = UpdateOptions { update_installer: true, ..Default::default() };
        let report = pipeline.run(&options).await.unwrap();

        assert!(report.installer_staged);
        assert!(report.mod_loader_updated, "mod-loader follows an installer update");
        let staged = root.path().join(crate::swap::staged_launcher_file());
        assert_eq!(std::fs::read(&staged).unwrap(), b"new launcher binary");
        assert_eq!(std::fs::read(&live).unwrap(), b"current launcher");
    }

    #[tokio::test]
    async fn no_steps_enabled_is_a_successful_noop() {
        let root = TempDir::new().unwrap();
        let pipeline = UpdatePipeline::new(
            root.path(),
            ArtifactUrls::default(),
            ModCatalog::builtin(),
        );

        let report = pipeline.run(&UpdateOptions::default()).await.unwrap();
        assert!(!report.any_writes());
        assert!(!report.backup_created);
    }
}
