//! Supervision of the external game process.
//!
//! The game executable is an external collaborator: the launcher starts it,
//! optionally waits for it, and tears it down. Process state is an explicit
//! `{Stopped, Running(child)}` value owned by one [`GameProcess`] supervisor,
//! so callers query [`GameProcess::is_running`] instead of null-checking a
//! shared handle.
//!
//! Teardown is terminate, wait up to five seconds, then force-kill. An OS
//! refusal to signal the process is logged as a warning and never aborts the
//! caller; a dead game process is not worth failing an update over.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::core::LauncherError;

/// How long to wait for the game to exit gracefully before force-killing.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Default file name of the game executable inside the installation root.
pub fn default_game_executable() -> String {
    format!("Game{}", std::env::consts::EXE_SUFFIX)
}

enum State {
    Stopped,
    Running(Child),
}

/// Owns the game process lifecycle for one executable path.
pub struct GameProcess {
    exe_path: PathBuf,
    state: State,
}

impl GameProcess {
    /// Supervisor for the game executable at `exe_path`. Starts stopped.
    pub fn new(exe_path: impl Into<PathBuf>) -> Self {
        Self { exe_path: exe_path.into(), state: State::Stopped }
    }

    /// Path of the supervised executable.
    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    /// Start the game.
    ///
    /// Refuses (with an error log, not an error return) when the game is
    /// already running, unless `force` is set. The working directory is the
    /// executable's parent so the game finds its data files.
    pub fn start(&mut self, force: bool) -> Result<(), LauncherError> {
        if self.is_running() && !force {
            error!("Game is already running");
            return Ok(());
        }

        let mut command = Command::new(&self.exe_path);
        if let Some(parent) = self.exe_path.parent() {
            command.current_dir(parent);
        }
        let child = command.spawn()?;
        info!("Game started with PID {:?}", child.id());
        self.state = State::Running(child);
        Ok(())
    }

    /// Whether the game process is currently alive.
    ///
    /// Reaps an exited child as a side effect so the state stays accurate.
    pub fn is_running(&mut self) -> bool {
        match &mut self.state {
            State::Stopped => false,
            State::Running(child) => match child.try_wait() {
                Ok(Some(_)) => {
                    self.state = State::Stopped;
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    warn!("Could not poll game process: {e}");
                    false
                }
            },
        }
    }

    /// Stop the game: signal it, wait up to the grace period, then kill.
    ///
    /// Permission errors from the OS are logged as warnings and do not abort
    /// the caller. The supervisor always ends up `Stopped`.
    pub async fn terminate(&mut self) {
        let State::Running(mut child) = std::mem::replace(&mut self.state, State::Stopped)
        else {
            return;
        };

        let pid = child.id();
        if let Err(e) = child.start_kill() {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                warn!("No permission to terminate the game process");
            } else if e.kind() != std::io::ErrorKind::InvalidInput {
                // InvalidInput means the child already exited
                warn!("Failed to signal game process: {e}");
            }
        }

        match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
            Ok(Ok(_)) => info!("Game with PID {pid:?} terminated"),
            Ok(Err(e)) => warn!("Failed to reap game process: {e}"),
            Err(_) => {
                warn!("Game with PID {pid:?} ignored termination; killing");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill game process: {e}");
                }
            }
        }
    }

    /// Wait for the game process to finish on its own.
    pub async fn wait(&mut self) -> Result<(), LauncherError> {
        if let State::Running(child) = &mut self.state {
            child.wait().await?;
            self.state = State::Stopped;
        }
        Ok(())
    }
}
