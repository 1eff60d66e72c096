//! Command-line interface for the mod installer/launcher.
//!
//! Each command lives in its own module with its own argument struct and
//! execution logic, keeping commands independently testable:
//!
//! - `install` - run the update pipeline (installer, game, mod-loader, mods)
//! - `sync` - reconcile installed mods against the desired list
//! - `restore` - restore the installation from its backup archive
//! - `launch` - start the game under the process supervisor
//!
//! The out-of-process binary swap is not a subcommand here; it is the
//! separate `modlauncher-swap` executable (see [`crate::swap`]), spawned by
//! `install` right before exit whenever a launcher update was staged.
//!
//! # Global options
//!
//! All commands accept `--verbose`/`--quiet` for log level and
//! `--config <settings.yaml>` to override settings discovery. Settings are
//! discovered in order: the `--config` flag, the per-user pointer file, the
//! default per-user location.

mod install;
mod launch;
mod restore;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{self, Settings};

/// Top-level CLI for the installer/launcher.
#[derive(Parser)]
#[command(
    name = "modlauncher",
    about = "Self-updating installer and launcher for game modifications",
    version,
    long_about = "Installs and keeps up to date a modded game installation: the launcher \
                  binary itself, the game build, the mod-loader build, and individual mods."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the settings document (overrides the pointer file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Install or update the game, mod-loader, launcher, and mods
    Install(install::InstallArgs),

    /// Reconcile installed mods against the desired mod list
    Sync(sync::SyncArgs),

    /// Restore the installation from its backup archive
    Restore(restore::RestoreArgs),

    /// Start the game
    Launch(launch::LaunchArgs),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        self.init_tracing();

        let settings = resolve_settings(self.config.clone()).await?;
        match self.command {
            Commands::Install(cmd) => cmd.execute(settings).await,
            Commands::Sync(cmd) => cmd.execute(settings).await,
            Commands::Restore(cmd) => cmd.execute(settings).await,
            Commands::Launch(cmd) => cmd.execute(settings).await,
        }
    }

    /// Initialize the global tracing subscriber from the verbosity flags.
    ///
    /// An explicit `RUST_LOG` wins over the flags so targeted filters keep
    /// working. Errors from double initialization are ignored to keep tests
    /// that execute multiple commands in-process happy.
    fn init_tracing(&self) {
        let default_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
    }
}

/// Resolved settings together with the path they came from (and save to).
pub struct ResolvedSettings {
    /// The loaded (or default) settings document
    pub settings: Settings,
    /// Where the document lives
    pub path: PathBuf,
}

/// Discover and load the settings document.
///
/// Order: the `--config` flag, the per-user pointer file, the default
/// per-user location. A missing document is not an error; defaults are
/// returned and the path records where a save would land.
async fn resolve_settings(flag: Option<PathBuf>) -> Result<ResolvedSettings> {
    let path = match flag {
        Some(path) => path,
        None => match config::read_pointer().await? {
            Some(path) => path,
            None => config::default_settings_path()?,
        },
    };
    let settings = Settings::load_or_default(&path).await?;
    Ok(ResolvedSettings { settings, path })
}
