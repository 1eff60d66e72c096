//! Out-of-process replacement of the running launcher binary.
//!
//! An executable cannot reliably overwrite or delete itself while it is
//! running, so the launcher never swaps its own binary. Instead it stages the
//! downloaded replacement next to itself (`modlauncher.new` suffix) and, just
//! before exiting, starts the short-lived `modlauncher-swap` process. That
//! coordinator runs the state machine implemented here:
//!
//! ```text
//! WAIT_UNLOCK -> SWAP -> RELAUNCH -> DONE
//! ```
//!
//! - `WAIT_UNLOCK` polls until the live binary is no longer locked by the
//!   exiting launcher, bounded at [`UNLOCK_TIMEOUT`].
//! - `SWAP` renames the live binary to a `.bak` rollback copy and moves the
//!   staged replacement into place.
//! - `RELAUNCH` starts the now-current launcher as a detached process rooted
//!   at the installation directory and does not wait on it.
//!
//! All three failure kinds (timeout, missing staged binary, IO during the
//! swap) are fatal and unrecovered: by construction there is no second
//! coordinator around to retry, so a human must intervene. The `.bak` copy
//! is the manual rollback point; it is never restored automatically.
//!
//! OS-level file locking is platform-dependent, so the polling loop goes
//! through the [`LockProbe`] capability and stays unit-testable with a fake
//! probe.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::core::LauncherError;

/// Bound on the unlock wait. The exiting launcher normally releases its
/// binary within a second or two; anything past this means it is stuck.
pub const UNLOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between lock probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// File name of the live launcher binary inside the installation directory.
pub fn launcher_file() -> String {
    format!("modlauncher{}", std::env::consts::EXE_SUFFIX)
}

/// File name of the staged replacement awaiting activation.
pub fn staged_launcher_file() -> String {
    format!("modlauncher.new{}", std::env::consts::EXE_SUFFIX)
}

/// File name of the previous launcher kept as a manual rollback point.
pub fn legacy_backup_file() -> String {
    format!("{}.bak", launcher_file())
}

/// Capability to test whether a file can be opened exclusively.
///
/// The real implementation asks the OS; tests substitute a fake to drive the
/// polling loop deterministically.
pub trait LockProbe {
    /// Returns `Ok(true)` when the file is openable (not locked), `Ok(false)`
    /// when the OS still refuses access, and an error for anything that makes
    /// waiting pointless.
    fn try_exclusive_open(&self, path: &Path) -> std::io::Result<bool>;
}

/// [`LockProbe`] backed by the real filesystem.
pub struct FsLockProbe;

impl LockProbe for FsLockProbe {
    fn try_exclusive_open(&self, path: &Path) -> std::io::Result<bool> {
        match std::fs::File::open(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            // Nothing to wait on if the live binary is gone entirely
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        }
    }
}

/// Runs the swap state machine for one installation directory.
pub struct SwapCoordinator<P: LockProbe> {
    install_dir: PathBuf,
    probe: P,
    timeout: Duration,
    poll_interval: Duration,
}

impl SwapCoordinator<FsLockProbe> {
    /// Coordinator with the real lock probe and default timing.
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self::with_probe(install_dir, FsLockProbe)
    }
}

impl<P: LockProbe> SwapCoordinator<P> {
    /// Coordinator with a custom lock probe (tests).
    pub fn with_probe(install_dir: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            install_dir: install_dir.into(),
            probe,
            timeout: UNLOCK_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the wait bound and poll interval (tests).
    #[must_use]
    pub fn with_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    fn live_path(&self) -> PathBuf {
        self.install_dir.join(launcher_file())
    }

    fn staged_path(&self) -> PathBuf {
        self.install_dir.join(staged_launcher_file())
    }

    fn backup_path(&self) -> PathBuf {
        self.install_dir.join(legacy_backup_file())
    }

    /// Run the full state machine: wait, swap, relaunch.
    pub async fn run(&self) -> Result<(), LauncherError> {
        // Precondition first so a missing staged binary fails fast instead
        // of burning the whole unlock wait.
        let staged = self.staged_path();
        if !staged.exists() {
            return Err(LauncherError::NotFound { path: staged.display().to_string() });
        }

        self.wait_unlock().await?;
        self.swap()?;
        self.relaunch()?;
        Ok(())
    }

    /// WAIT_UNLOCK: poll the live binary until it opens, bounded by the
    /// configured timeout.
    pub async fn wait_unlock(&self) -> Result<(), LauncherError> {
        let live = self.live_path();
        let started = Instant::now();

        loop {
            if self.probe.try_exclusive_open(&live)? {
                debug!("Launcher binary is unlocked");
                return Ok(());
            }
            if started.elapsed() > self.timeout {
                return Err(LauncherError::Timeout {
                    operation: "launcher binary to unlock".to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// SWAP: retire the live binary to its `.bak` name and move the staged
    /// replacement into place.
    ///
    /// Requires the staged binary to exist; otherwise nothing is renamed and
    /// the live binary path is left untouched.
    pub fn swap(&self) -> Result<(), LauncherError> {
        let live = self.live_path();
        let staged = self.staged_path();
        let backup = self.backup_path();

        if !staged.exists() {
            return Err(LauncherError::NotFound { path: staged.display().to_string() });
        }

        if backup.exists() {
            std::fs::remove_file(&backup)?;
        }

        if live.exists() {
            std::fs::rename(&live, &backup)?;
            debug!("Retired previous launcher to {}", backup.display());
        }

        std::fs::rename(&staged, &live)?;
        info!("Activated staged launcher at {}", live.display());
        Ok(())
    }

    /// RELAUNCH: start the swapped-in launcher as a detached process with its
    /// working directory set to the installation directory. Does not wait.
    pub fn relaunch(&self) -> Result<(), LauncherError> {
        let live = self.live_path();
        std::process::Command::new(&live).current_dir(&self.install_dir).spawn()?;
        info!("Relaunched {}", live.display());
        Ok(())
    }
}
