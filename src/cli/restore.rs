//! The `restore` command: roll the installation back to its snapshot.

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;

use super::ResolvedSettings;
use crate::backup::BackupManager;

/// Arguments for `modlauncher restore`.
#[derive(Parser, Debug)]
pub struct RestoreArgs {}

impl RestoreArgs {
    /// Extract the backup archive over the installation root.
    pub async fn execute(self, resolved: ResolvedSettings) -> Result<()> {
        let Some(root) = resolved.settings.game_install_path else {
            bail!("No game installation path configured; run 'modlauncher install' first");
        };

        let manager = BackupManager::new(&root);
        if manager.restore_backup().await? {
            println!("{} installation restored from backup", "✓".green());
        } else {
            println!("{} no backup found; nothing restored", "!".yellow());
        }
        Ok(())
    }
}
