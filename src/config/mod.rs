//! Settings file support for mycap.
//!
//! This module handles loading, validating and saving the user settings stored
//! at `<data dir>/MyCap/settings.toml` (`%APPDATA%\MyCap\settings.toml` on
//! Windows). Settings include the save folder, output format, feedback mode,
//! keyboard shortcuts and the last selected region.
//!
//! A missing file is created with defaults. A file that cannot be parsed, or
//! whose shortcuts are incomplete or clash, is reset to defaults and rewritten.

pub mod enums;
pub mod keybindings;

pub use enums::ImageFormat;
pub use keybindings::{Action, Shortcuts};

use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::Rect;

/// Folder under the platform data directory holding mycap's own files.
pub const APP_DIR_NAME: &str = "MyCap";
const SETTINGS_FILE_NAME: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file {path} is invalid: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Settings I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the user data directory")]
    NoDataDir,
}

/// Main settings structure.
///
/// All fields have defaults, so a partial file is filled in on load.
///
/// # Example TOML
/// ```toml
/// save_directory = "C:\\Users\\me\\Pictures\\MyCap"
/// auto_save = true
/// default_format = "png"
/// quiet_mode = false
/// auto_start = false
///
/// [last_region]
/// x = 100
/// y = 80
/// width = 640
/// height = 480
///
/// [shortcuts]
/// region_select = "Ctrl+F1"
/// full_screen = "Ctrl+F2"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    /// Folder that receives auto-saved captures
    #[serde(default = "default_save_directory")]
    pub save_directory: PathBuf,

    /// Write every capture to `save_directory`
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,

    /// Encoding used for auto-saved captures
    #[serde(default)]
    pub default_format: ImageFormat,

    /// Flash instead of showing a preview for hotkey captures
    #[serde(default)]
    pub quiet_mode: bool,

    /// Start with the user session
    #[serde(default)]
    pub auto_start: bool,

    /// Last committed selection, used by the repeat-region action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_region: Option<Rect>,

    /// One key combination per action
    #[serde(default)]
    pub shortcuts: Shortcuts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_directory: default_save_directory(),
            auto_save: default_auto_save(),
            default_format: ImageFormat::default(),
            quiet_mode: false,
            auto_start: false,
            last_region: None,
            shortcuts: Shortcuts::default(),
        }
    }
}

fn default_auto_save() -> bool {
    true
}

/// `Pictures/MyCap`, falling back to the home or current directory.
pub fn default_save_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// `<data dir>/MyCap`.
pub fn app_data_dir() -> Result<PathBuf, SettingsError> {
    Ok(dirs::data_dir()
        .ok_or(SettingsError::NoDataDir)?
        .join(APP_DIR_NAME))
}

impl Settings {
    /// Checks the parts of the settings that cannot be fixed in place.
    ///
    /// # Errors
    /// Returns a description of the first missing, unparsable or duplicate
    /// shortcut.
    pub fn validate(&self) -> Result<(), String> {
        self.shortcuts.build_action_map().map(|_| ())
    }

    /// Drops values that are well-formed but unusable.
    fn normalize(&mut self) {
        if self.last_region.is_some_and(|rect| rect.is_empty()) {
            warn!("Ignoring empty saved region");
            self.last_region = None;
        }
        if self.save_directory.as_os_str().is_empty() {
            warn!("Empty save_directory, falling back to the default");
            self.save_directory = default_save_directory();
        }
    }
}

/// How [`SettingsStore::load_or_reset`] obtained its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// No file existed; defaults were written.
    Created,
    /// The file was invalid and has been overwritten with defaults.
    Reset(String),
}

#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub status: LoadStatus,
}

/// Reads and writes one settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data dir>/MyCap/settings.toml`.
    ///
    /// # Errors
    /// Returns [`SettingsError::NoDataDir`] if the data directory cannot be
    /// determined (e.g., HOME not set).
    pub fn default_location() -> Result<Self, SettingsError> {
        Ok(Self::new(app_data_dir()?.join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads and validates the settings file.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read (including when it does not exist)
    /// - The file contains invalid TOML or fails validation
    pub fn load(&self) -> Result<Settings, SettingsError> {
        let text = fs::read_to_string(&self.path)?;

        let mut settings: Settings = toml::from_str(&text).map_err(|e| SettingsError::Corrupt {
            path: self.path.clone(),
            reason: e.message().to_string(),
        })?;

        settings.validate().map_err(|reason| SettingsError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;
        settings.normalize();

        debug!("Settings: {:?}", settings);
        Ok(settings)
    }

    /// Loads the settings, creating or resetting the file when needed.
    ///
    /// # Errors
    /// Returns an error only when the file cannot be read for a reason other
    /// than being absent, or the defaults cannot be written.
    pub fn load_or_reset(&self) -> Result<LoadedSettings, SettingsError> {
        match self.load() {
            Ok(settings) => {
                info!("Loaded settings from {}", self.path.display());
                Ok(LoadedSettings {
                    settings,
                    status: LoadStatus::Loaded,
                })
            }
            Err(SettingsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "Settings file not found, creating defaults at {}",
                    self.path.display()
                );
                let settings = self.reset()?;
                Ok(LoadedSettings {
                    settings,
                    status: LoadStatus::Created,
                })
            }
            Err(SettingsError::Corrupt { reason, .. }) => {
                warn!(
                    "Settings at {} are invalid ({}), resetting to defaults",
                    self.path.display(),
                    reason
                );
                let settings = self.reset()?;
                Ok(LoadedSettings {
                    settings,
                    status: LoadStatus::Reset(reason),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Rewrites the whole file.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, the settings
    /// cannot be serialized, or the file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let text = toml::to_string_pretty(settings)?;
        fs::write(&self.path, text)?;

        info!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Overwrites the file with defaults and returns them.
    pub fn reset(&self) -> Result<Settings, SettingsError> {
        let settings = Settings::default();
        self.save(&settings)?;
        Ok(settings)
    }

    /// Persists `rect` as the saved region, keeping every other value on disk.
    ///
    /// # Errors
    /// An invalid file is reported as [`SettingsError::Corrupt`] and left
    /// untouched; only a missing file is started from defaults.
    pub fn remember_region(&self, rect: Rect) -> Result<Settings, SettingsError> {
        let mut settings = match self.load() {
            Ok(settings) => settings,
            Err(SettingsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(e),
        };
        settings.last_region = Some(rect);
        self.save(&settings)?;
        debug!("Remembered region {}", rect);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("MyCap").join("settings.toml"))
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let loaded = store.load_or_reset().unwrap();
        assert_eq!(loaded.status, LoadStatus::Created);
        assert_eq!(loaded.settings, Settings::default());
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_uses_defaults_for_the_rest() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "quiet_mode = true\ndefault_format = \"jpeg\"\n").unwrap();

        let settings = store.load().unwrap();
        assert!(settings.quiet_mode);
        assert!(settings.auto_save);
        assert_eq!(settings.default_format, ImageFormat::Jpeg);
        assert_eq!(settings.shortcuts, Shortcuts::default());
    }

    #[test]
    fn missing_hotkey_resets_and_persists_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            "quiet_mode = true\n\n[shortcuts]\nregion_select = \"Ctrl+F1\"\n",
        )
        .unwrap();

        let loaded = store.load_or_reset().unwrap();
        assert!(matches!(loaded.status, LoadStatus::Reset(ref reason) if reason.contains("full_screen")));
        assert_eq!(loaded.settings, Settings::default());

        let on_disk = store.load().unwrap();
        assert_eq!(on_disk, Settings::default());
        assert!(!on_disk.quiet_mode);
    }

    #[test]
    fn unparsable_file_is_reset() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "auto_save = \"sometimes\"\n[[[").unwrap();

        assert!(matches!(store.load(), Err(SettingsError::Corrupt { .. })));
        let loaded = store.load_or_reset().unwrap();
        assert!(matches!(loaded.status, LoadStatus::Reset(_)));
        assert!(store.load().is_ok());
    }

    #[test]
    fn duplicate_hotkeys_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut settings = Settings::default();
        settings.shortcuts.set(Action::FullScreen, "Ctrl+F1").unwrap();
        store.save(&settings).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Duplicate keybinding"));
    }

    #[test]
    fn last_region_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.reset().unwrap();

        let rect = Rect::new(-200, 40, 640, 480);
        let updated = store.remember_region(rect).unwrap();
        assert_eq!(updated.last_region, Some(rect));
        assert_eq!(store.load().unwrap().last_region, Some(rect));
    }

    #[test]
    fn remember_region_keeps_other_values() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut settings = Settings::default();
        settings.quiet_mode = true;
        settings.default_format = ImageFormat::Bmp;
        store.save(&settings).unwrap();

        store.remember_region(Rect::new(0, 0, 10, 10)).unwrap();
        let reloaded = store.load().unwrap();
        assert!(reloaded.quiet_mode);
        assert_eq!(reloaded.default_format, ImageFormat::Bmp);
    }

    #[test]
    fn remember_region_leaves_an_invalid_file_alone() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let text = "save_directory = \"/keep\"\nauto_save = \"oops\"\n";
        fs::write(store.path(), text).unwrap();

        let err = store.remember_region(Rect::new(1, 2, 3, 4)).unwrap_err();
        assert!(matches!(err, SettingsError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), text);
    }

    #[test]
    fn remember_region_creates_a_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.remember_region(Rect::new(1, 2, 3, 4)).unwrap();
        assert_eq!(store.load().unwrap().last_region, Some(Rect::new(1, 2, 3, 4)));
    }

    #[test]
    fn empty_saved_region_is_dropped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut settings = Settings::default();
        settings.last_region = Some(Rect::new(5, 5, 0, 10));
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap().last_region, None);
    }

    #[test]
    fn shortcuts_are_written_as_a_table() {
        let text = toml::to_string_pretty(&Settings::default()).unwrap();
        assert!(text.contains("[shortcuts]"));
        assert!(text.contains("region_select = \"Ctrl+F1\""));
        assert!(!text.contains("last_region"));
    }
}
