// novelshelf Settings Engine
// Owns the reader, download and theme settings: loading, write-through setters,
// toggles, and resetting to defaults.
// Settings are stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::{
    AppSettings, ThemeMode, COLOR_BLACK, COLOR_WHITE, MAX_INDENT_SIZE, MAX_PARAGRAPH_SPACING, MAX_TEXT_SIZE,
};

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Checks the bounds every setter enforces.
fn validate(settings: &AppSettings) -> Result<(), SettingsError> {
    let reader = &settings.reader;
    if !(1..=MAX_TEXT_SIZE).contains(&reader.text_size) {
        return Err(SettingsError::InvalidValue(format!(
            "text size must be in 1..={}",
            MAX_TEXT_SIZE
        )));
    }
    if reader.indent_size > MAX_INDENT_SIZE {
        return Err(SettingsError::InvalidValue(format!(
            "indent size must be at most {}",
            MAX_INDENT_SIZE
        )));
    }
    if reader.paragraph_spacing > MAX_PARAGRAPH_SPACING {
        return Err(SettingsError::InvalidValue(format!(
            "paragraph spacing must be at most {}",
            MAX_PARAGRAPH_SPACING
        )));
    }
    if settings.download.directory.trim().is_empty() {
        return Err(SettingsError::InvalidValue("download directory cannot be empty".to_string()));
    }
    Ok(())
}

/// Settings engine implementation that persists settings as JSON on disk.
///
/// Constructed once by the host and passed by reference to whatever needs
/// settings. Every mutation updates memory first and then writes the whole
/// file; when the write fails the error is returned but the in-memory value
/// stays changed, so the session keeps behaving as the user asked.
pub struct SettingsEngine {
    config_path: String,
    settings: AppSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine holding defaults until [`load`] runs.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    ///
    /// [`load`]: SettingsEngineTrait::load
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: AppSettings::default(),
        }
    }

    /// Applies `change` to the in-memory settings and writes through.
    ///
    /// The change is checked on a copy first; a rejected change leaves the
    /// settings untouched.
    fn update<F>(&mut self, change: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut next = self.settings.clone();
        change(&mut next);
        validate(&next)?;
        self.settings = next;
        self.save().map_err(|e| {
            warn!("settings changed in memory but not persisted: {}", e);
            e
        })
    }

    pub fn set_text_size(&mut self, size: u32) -> Result<(), SettingsError> {
        self.update(|s| s.reader.text_size = size)
    }

    pub fn set_indent_size(&mut self, indent: u32) -> Result<(), SettingsError> {
        self.update(|s| s.reader.indent_size = indent)
    }

    pub fn set_paragraph_spacing(&mut self, spacing: u32) -> Result<(), SettingsError> {
        self.update(|s| s.reader.paragraph_spacing = spacing)
    }

    pub fn set_download_dir(&mut self, dir: &str) -> Result<(), SettingsError> {
        let dir = dir.to_string();
        self.update(move |s| s.download.directory = dir)
    }

    /// Switches theme by its stored index: 0 light, 1 dark, 2 dark overlay.
    pub fn change_theme_mode(&mut self, index: i64) -> Result<ThemeMode, SettingsError> {
        let mode = ThemeMode::from_index(index).ok_or_else(|| {
            SettingsError::InvalidValue(format!("theme index {} is not in 0..=2", index))
        })?;
        self.update(|s| s.advanced.theme_mode = mode)?;
        info!("theme changed to {:?}", mode);
        Ok(mode)
    }

    pub fn is_tap_to_scroll(&self) -> bool {
        self.settings.reader.tap_to_scroll
    }

    /// Flips tap-to-scroll and returns the new state.
    pub fn toggle_tap_to_scroll(&mut self) -> Result<bool, SettingsError> {
        self.update(|s| s.reader.tap_to_scroll = !s.reader.tap_to_scroll)?;
        Ok(self.settings.reader.tap_to_scroll)
    }

    pub fn is_download_paused(&self) -> bool {
        self.settings.download.paused
    }

    /// Flips the global download pause and returns the new state.
    pub fn toggle_pause(&mut self) -> Result<bool, SettingsError> {
        self.update(|s| s.download.paused = !s.download.paused)?;
        info!("downloads {}", if self.settings.download.paused { "paused" } else { "resumed" });
        Ok(self.settings.download.paused)
    }

    /// Night mode means white text, regardless of the background.
    pub fn is_reader_night_mode(&self) -> bool {
        self.settings.reader.text_color == COLOR_WHITE
    }

    pub fn set_night_mode(&mut self) -> Result<(), SettingsError> {
        self.set_reader_color(COLOR_WHITE, COLOR_BLACK)
    }

    pub fn unset_night_mode(&mut self) -> Result<(), SettingsError> {
        self.set_reader_color(COLOR_BLACK, COLOR_WHITE)
    }

    pub fn swap_reader_color(&mut self) -> Result<(), SettingsError> {
        if self.is_reader_night_mode() {
            self.unset_night_mode()
        } else {
            self.set_night_mode()
        }
    }

    fn set_reader_color(&mut self, text: u32, background: u32) -> Result<(), SettingsError> {
        self.update(|s| {
            s.reader.text_color = text;
            s.reader.background_color = background;
        })
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings. Keys missing
    /// from the file take their defaults.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.settings = AppSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        validate(&settings)?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates an individual setting by dot-notation key path, e.g.
    /// `"reader.text_size"` or `"download.directory"`.
    ///
    /// The new value is validated by deserializing the whole tree back into
    /// `AppSettings` and then checking the same bounds as the typed setters;
    /// the file is written only when both succeed.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        {
            let (last, path) = match parts.split_last() {
                Some(split) => split,
                None => return Err(SettingsError::InvalidKey(key.to_string())),
            };

            let mut current = &mut json_value;
            for part in path {
                current = current
                    .get_mut(*part)
                    .ok_or_else(|| SettingsError::InvalidKey(key.to_string()))?;
            }

            match current {
                serde_json::Value::Object(map) if map.contains_key(*last) => {
                    map.insert(last.to_string(), value);
                }
                _ => return Err(SettingsError::InvalidKey(key.to_string())),
            }
        }

        let new_settings: AppSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.update(move |s| *s = new_settings)
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.update(|s| *s = AppSettings::default())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
