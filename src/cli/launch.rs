//! The `launch` command: start the game under the process supervisor.

use anyhow::{Result, bail};
use clap::Parser;

use super::ResolvedSettings;
use crate::game::{GameProcess, default_game_executable};

/// Arguments for `modlauncher launch`.
#[derive(Parser, Debug)]
pub struct LaunchArgs {
    /// Game executable file name inside the installation root
    #[arg(long, value_name = "FILE")]
    pub exe: Option<String>,

    /// Start even if a previous game process still looks alive
    #[arg(long)]
    pub force: bool,
}

impl LaunchArgs {
    /// Start the game and wait for it to exit.
    pub async fn execute(self, resolved: ResolvedSettings) -> Result<()> {
        let Some(root) = resolved.settings.game_install_path else {
            bail!("No game installation path configured; run 'modlauncher install' first");
        };

        let exe = root.join(self.exe.unwrap_or_else(default_game_executable));
        if !exe.exists() {
            bail!("Game executable not found at {}", exe.display());
        }

        let mut game = GameProcess::new(exe);
        game.start(self.force)?;
        game.wait().await?;
        Ok(())
    }
}
