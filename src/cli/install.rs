//! The `install` command: one full update run.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use super::ResolvedSettings;
use crate::config::{self, Settings};
use crate::game::GameProcess;
use crate::mods::ModCatalog;
use crate::pipeline::{ArtifactUrls, UpdateOptions, UpdatePipeline};

/// Arguments for `modlauncher install`.
///
/// Flags layer over the saved settings document: anything set here wins, and
/// the merged result is persisted so the next run repeats the same choices
/// without flags.
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Directory containing the game installation
    #[arg(long, value_name = "DIR")]
    pub game_path: Option<PathBuf>,

    /// Mods to keep installed (repeatable)
    #[arg(long = "mod", value_name = "NAME")]
    pub mods: Vec<String>,

    /// Snapshot the installation before any destructive write
    #[arg(long)]
    pub backup: bool,

    /// Restore the snapshot if the update fails
    #[arg(long)]
    pub restore_on_failure: bool,

    /// Download and stage a fresh launcher binary
    #[arg(long)]
    pub update_installer: bool,

    /// Download and extract the latest game build
    #[arg(long)]
    pub update_game: bool,

    /// Download and extract the latest mod-loader build
    #[arg(long)]
    pub update_mod_loader: bool,

    /// Reconcile installed mods against the saved mod list
    #[arg(long)]
    pub update_mods: bool,

    /// Start the game after a successful run
    #[arg(long)]
    pub run: bool,
}

impl InstallArgs {
    /// Run the update pipeline with the merged settings, persist them, and
    /// hand off to the swap coordinator or the game as configured.
    pub async fn execute(self, resolved: ResolvedSettings) -> Result<()> {
        let run_after = self.run;
        let update_mod_loader = self.update_mod_loader;

        let from_cli = Settings {
            game_install_path: self.game_path,
            mod_list: self.mods,
            auto_run: self.run,
            auto_update_installer: self.update_installer,
            auto_update_game: self.update_game,
            auto_update_mods: self.update_mods,
            backup_before_install: self.backup,
            restore_backup_on_failure: self.restore_on_failure,
            settings_save_path: Some(resolved.path.clone()),
            installer_install_path: None,
        };
        let settings = from_cli.merged_over(&resolved.settings);

        let Some(root) = settings.game_install_path.clone() else {
            bail!("No game installation path configured; pass --game-path on the first run");
        };
        if !root.is_dir() {
            bail!("Game installation path {} is not a directory", root.display());
        }

        let catalog = ModCatalog::builtin();
        catalog
            .validate(&settings.mod_list)
            .context("One or more requested mods are not available")?;

        // Persist the merged choices before any destructive work so the next
        // run picks them up even if this one fails.
        settings.save(&resolved.path).await?;
        config::write_pointer(&resolved.path).await?;

        let options = UpdateOptions {
            update_installer: settings.auto_update_installer,
            backup_before_install: settings.backup_before_install,
            update_game: settings.auto_update_game,
            update_mod_loader,
            sync_mods: !settings.mod_list.is_empty() || settings.auto_update_mods,
            mod_list: settings.mod_list.clone(),
            restore_on_failure: settings.restore_backup_on_failure,
        };

        let pipeline = UpdatePipeline::new(&root, ArtifactUrls::default(), catalog);
        let report = pipeline.run(&options).await?;

        println!("{} installation is up to date", "✓".green());

        if report.installer_staged {
            // The running binary is about to be replaced: start the swap
            // coordinator and get out of its way instead of launching the game.
            spawn_swap_coordinator(&root)?;
            info!("Launcher update staged; exiting for the swap coordinator");
            return Ok(());
        }

        if settings.auto_run || run_after {
            let exe = root.join(crate::game::default_game_executable());
            let mut game = GameProcess::new(exe);
            game.start(false)?;
            game.wait().await?;
        }

        Ok(())
    }
}

/// Start `modlauncher-swap <root>` as a detached process.
///
/// The coordinator binary ships next to the launcher binary itself.
fn spawn_swap_coordinator(root: &std::path::Path) -> Result<()> {
    let coordinator = std::env::current_exe()
        .context("Failed to locate the current executable")?
        .with_file_name(format!("modlauncher-swap{}", std::env::consts::EXE_SUFFIX));

    std::process::Command::new(&coordinator)
        .arg(root)
        .spawn()
        .with_context(|| format!("Failed to start {}", coordinator.display()))?;
    Ok(())
}
