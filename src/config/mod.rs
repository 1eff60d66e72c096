//! Settings document and per-user pointer file.
//!
//! User choices live in a YAML settings document, usually
//! `settings.yaml` in the per-user configuration directory. A one-line
//! pointer file named `config` in that directory records the absolute path of
//! the settings document, so a freshly launched binary can find its settings
//! wherever the user chose to keep them.
//!
//! Only meaningful values are serialized: `None`, empty lists, and `false`
//! flags are omitted, keeping the document down to what the user actually
//! set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory name under the platform config dir that owns our files.
const APP_DIR: &str = "modlauncher";

/// Name of the pointer file holding the settings document path.
const POINTER_FILE: &str = "config";

/// Default file name for the settings document.
pub const SETTINGS_FILE: &str = "settings.yaml";

fn is_false(value: &bool) -> bool {
    !*value
}

/// Persisted user choices driving the update pipeline and launcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory containing the game executable and data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_install_path: Option<PathBuf>,

    /// Mod names to keep installed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mod_list: Vec<String>,

    /// Start the game after a successful update run
    #[serde(skip_serializing_if = "is_false")]
    pub auto_run: bool,

    /// Refresh the launcher binary on each run
    #[serde(skip_serializing_if = "is_false")]
    pub auto_update_installer: bool,

    /// Refresh the game build on each run
    #[serde(skip_serializing_if = "is_false")]
    pub auto_update_game: bool,

    /// Reconcile installed mods on each run
    #[serde(skip_serializing_if = "is_false")]
    pub auto_update_mods: bool,

    /// Snapshot the installation before destructive writes
    #[serde(skip_serializing_if = "is_false")]
    pub backup_before_install: bool,

    /// Restore the snapshot when an update run fails
    #[serde(skip_serializing_if = "is_false")]
    pub restore_backup_on_failure: bool,

    /// Where this settings document is saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_save_path: Option<PathBuf>,

    /// Where the launcher binary itself is installed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_install_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a YAML document.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// Load settings if the document exists, defaults otherwise.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() { Self::load(path).await } else { Ok(Self::default()) }
    }

    /// Save settings as YAML, creating parent directories as needed.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Fill unset fields from another settings value.
    ///
    /// `self` wins wherever it carries an explicit value (`Some`, non-empty
    /// list, `true`); `other` only fills the gaps. Used to layer CLI
    /// arguments over the saved document.
    #[must_use]
    pub fn merged_over(mut self, other: &Self) -> Self {
        if self.game_install_path.is_none() {
            self.game_install_path = other.game_install_path.clone();
        }
        if self.mod_list.is_empty() {
            self.mod_list = other.mod_list.clone();
        }
        self.auto_run |= other.auto_run;
        self.auto_update_installer |= other.auto_update_installer;
        self.auto_update_game |= other.auto_update_game;
        self.auto_update_mods |= other.auto_update_mods;
        self.backup_before_install |= other.backup_before_install;
        self.restore_backup_on_failure |= other.restore_backup_on_failure;
        if self.settings_save_path.is_none() {
            self.settings_save_path = other.settings_save_path.clone();
        }
        if self.installer_install_path.is_none() {
            self.installer_install_path = other.installer_install_path.clone();
        }
        self
    }
}

/// Per-user directory that owns the pointer file and default settings.
pub fn app_config_dir() -> Result<PathBuf> {
    let base =
        dirs::config_dir().context("Could not determine the user configuration directory")?;
    Ok(base.join(APP_DIR))
}

/// Default location of the settings document.
pub fn default_settings_path() -> Result<PathBuf> {
    Ok(app_config_dir()?.join(SETTINGS_FILE))
}

/// Read the pointer file, returning the recorded settings path if present.
pub async fn read_pointer() -> Result<Option<PathBuf>> {
    let pointer = app_config_dir()?.join(POINTER_FILE);
    if !pointer.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&pointer)
        .await
        .with_context(|| format!("Failed to read {}", pointer.display()))?;
    let trimmed = content.trim();
    if trimmed.is_empty() { Ok(None) } else { Ok(Some(PathBuf::from(trimmed))) }
}

/// Record the settings document path in the pointer file.
pub async fn write_pointer(settings_path: &Path) -> Result<()> {
    let dir = app_config_dir()?;
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let pointer = dir.join(POINTER_FILE);
    fs::write(&pointer, settings_path.display().to_string())
        .await
        .with_context(|| format!("Failed to write {}", pointer.display()))?;
    Ok(())
}
