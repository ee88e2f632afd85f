use serde::{Deserialize, Serialize};

use crate::platform;

/// Opaque black, ARGB.
pub const COLOR_BLACK: u32 = 0xFF00_0000;
/// Opaque white, ARGB.
pub const COLOR_WHITE: u32 = 0xFFFF_FFFF;

/// Largest reader text size, in px.
pub const MAX_TEXT_SIZE: u32 = 72;
/// Largest indent, in indent levels.
pub const MAX_INDENT_SIZE: u32 = 8;
/// Most blank lines between paragraphs.
pub const MAX_PARAGRAPH_SPACING: u32 = 8;

/// Top-level application settings container.
///
/// Every section is `#[serde(default)]` so a settings file missing any key
/// loads with that key's documented default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    pub reader: ReaderSettings,
    pub download: DownloadSettings,
    pub advanced: AdvancedSettings,
}

/// Reader view settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderSettings {
    pub text_color: u32,
    pub background_color: u32,
    pub text_size: u32,
    pub paragraph_spacing: u32,
    pub indent_size: u32,
    pub tap_to_scroll: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            text_color: COLOR_BLACK,
            background_color: COLOR_WHITE,
            text_size: 14,
            paragraph_spacing: 1,
            indent_size: 1,
            tap_to_scroll: false,
        }
    }
}

/// Chapter download settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadSettings {
    pub directory: String,
    pub paused: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            directory: platform::default_download_dir()
                .to_string_lossy()
                .to_string(),
            paused: false,
        }
    }
}

/// Settings that rarely change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AdvancedSettings {
    pub theme_mode: ThemeMode,
}

/// Application theme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
    OverlayDark,
}

impl ThemeMode {
    /// Maps the stored theme index (0, 1, 2) to a mode.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(ThemeMode::Light),
            1 => Some(ThemeMode::Dark),
            2 => Some(ThemeMode::OverlayDark),
            _ => None,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            ThemeMode::Light => 0,
            ThemeMode::Dark => 1,
            ThemeMode::OverlayDark => 2,
        }
    }
}
