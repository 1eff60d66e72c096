//! The `sync` command: mod reconciliation without a full update run.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;

use super::ResolvedSettings;
use crate::fetch::ArtifactFetcher;
use crate::mods::{ModCatalog, ModSynchronizer, SyncProgress};

/// Arguments for `modlauncher sync`.
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Mods to keep installed; defaults to the saved mod list
    #[arg(value_name = "NAME")]
    pub mods: Vec<String>,

    /// List the available catalog mods and exit
    #[arg(long)]
    pub list: bool,
}

impl SyncArgs {
    /// Reconcile the `Mods/` directory against the desired mod list.
    pub async fn execute(self, resolved: ResolvedSettings) -> Result<()> {
        let catalog = ModCatalog::builtin();

        if self.list {
            for name in catalog.names() {
                println!("{name}");
            }
            return Ok(());
        }

        let desired =
            if self.mods.is_empty() { resolved.settings.mod_list.clone() } else { self.mods };
        catalog.validate(&desired).context("One or more requested mods are not available")?;

        let Some(root) = resolved.settings.game_install_path else {
            bail!("No game installation path configured; run 'modlauncher install' first");
        };

        let fetcher = ArtifactFetcher::new();
        let synchronizer = ModSynchronizer::new(&fetcher, &catalog);
        let mut progress = SyncProgress::default();
        synchronizer.sync(&desired, &root, &mut progress).await?;

        println!(
            "{} mods synchronized ({} installed, {} removed)",
            "✓".green(),
            progress.installed,
            progress.removed
        );
        Ok(())
    }
}
