//! Theme Engine: maps the app theme to a style and CSS variables, and sizes the library grid.

use std::collections::HashMap;

use crate::services::reader_mode::css_color;
use crate::types::errors::ThemeError;
use crate::types::settings::{ReaderSettings, ThemeMode};

/// Trait defining the theme engine interface.
pub trait ThemeEngineTrait {
    fn set_theme(&mut self, mode: ThemeMode);
    fn get_theme(&self) -> ThemeMode;
    fn style_name(&self) -> &'static str;
    fn set_accent_color(&mut self, color: &str) -> Result<(), ThemeError>;
    fn get_accent_color(&self) -> &str;
    fn get_css_variables(&self) -> HashMap<String, String>;
    fn reader_css_variables(&self, reader: &ReaderSettings) -> HashMap<String, String>;
}

/// Material light colors.
struct LightPalette;
impl LightPalette {
    const BG_PRIMARY: &'static str = "#ffffff";
    const BG_SURFACE: &'static str = "#f5f5f5";
    const TEXT_PRIMARY: &'static str = "#212121";
    const TEXT_SECONDARY: &'static str = "#757575";
    const DIVIDER: &'static str = "#e0e0e0";
}

/// Material dark colors.
struct DarkPalette;
impl DarkPalette {
    const BG_PRIMARY: &'static str = "#121212";
    const BG_SURFACE: &'static str = "#1e1e1e";
    const TEXT_PRIMARY: &'static str = "#e0e0e0";
    const TEXT_SECONDARY: &'static str = "#9e9e9e";
    const DIVIDER: &'static str = "#2c2c2c";
}

/// Dark overlay on top of the host surface; the background shows through.
struct OverlayDarkPalette;
impl OverlayDarkPalette {
    const BG_PRIMARY: &'static str = "rgba(0, 0, 0, 0.6)";
    const BG_SURFACE: &'static str = "rgba(33, 33, 33, 0.8)";
    const TEXT_PRIMARY: &'static str = "#ffffff";
    const TEXT_SECONDARY: &'static str = "#bdbdbd";
    const DIVIDER: &'static str = "rgba(255, 255, 255, 0.12)";
}

/// Validates a hex color string (e.g. "#6200ee" or "#fff").
fn is_valid_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6)
        && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Number of library grid columns for a screen `width_px` wide at `density`
/// pixels per dp, with columns `column_dp` wide. Never less than one.
pub fn grid_columns(width_px: u32, density: f32, column_dp: f32) -> u32 {
    if density <= 0.0 || column_dp <= 0.0 {
        return 1;
    }
    let width_dp = width_px as f32 / density;
    ((width_dp / column_dp + 0.5) as u32).max(1)
}

/// The theme engine implementation.
pub struct ThemeEngine {
    current_theme: ThemeMode,
    accent_color: String,
}

impl ThemeEngine {
    /// Creates a new ThemeEngine with the given initial mode and default accent color.
    pub fn new(mode: ThemeMode) -> Self {
        Self {
            current_theme: mode,
            accent_color: "#6200ee".to_string(),
        }
    }

    /// Builds the CSS variable map for a given palette.
    fn build_variables(
        bg_primary: &str,
        bg_surface: &str,
        text_primary: &str,
        text_secondary: &str,
        divider: &str,
        accent: &str,
    ) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("--bg-primary".into(), bg_primary.into());
        vars.insert("--bg-surface".into(), bg_surface.into());
        vars.insert("--text-primary".into(), text_primary.into());
        vars.insert("--text-secondary".into(), text_secondary.into());
        vars.insert("--divider-color".into(), divider.into());
        vars.insert("--accent-color".into(), accent.into());
        vars.insert("--font-family".into(), "Roboto, 'Noto Sans', Helvetica, Arial, sans-serif".into());
        vars
    }
}

impl ThemeEngineTrait for ThemeEngine {
    fn set_theme(&mut self, mode: ThemeMode) {
        self.current_theme = mode;
    }

    fn get_theme(&self) -> ThemeMode {
        self.current_theme
    }

    fn style_name(&self) -> &'static str {
        match self.current_theme {
            ThemeMode::Light => "Theme.MaterialComponents.Light.NoActionBar",
            ThemeMode::Dark => "Theme.MaterialComponents.NoActionBar",
            ThemeMode::OverlayDark => "ThemeOverlay.MaterialComponents.Dark",
        }
    }

    fn set_accent_color(&mut self, color: &str) -> Result<(), ThemeError> {
        if !is_valid_hex_color(color) {
            return Err(ThemeError::InvalidColor(color.to_string()));
        }
        self.accent_color = color.to_string();
        Ok(())
    }

    fn get_accent_color(&self) -> &str {
        &self.accent_color
    }

    fn get_css_variables(&self) -> HashMap<String, String> {
        let accent = &self.accent_color;
        match self.current_theme {
            ThemeMode::Light => Self::build_variables(
                LightPalette::BG_PRIMARY,
                LightPalette::BG_SURFACE,
                LightPalette::TEXT_PRIMARY,
                LightPalette::TEXT_SECONDARY,
                LightPalette::DIVIDER,
                accent,
            ),
            ThemeMode::Dark => Self::build_variables(
                DarkPalette::BG_PRIMARY,
                DarkPalette::BG_SURFACE,
                DarkPalette::TEXT_PRIMARY,
                DarkPalette::TEXT_SECONDARY,
                DarkPalette::DIVIDER,
                accent,
            ),
            ThemeMode::OverlayDark => Self::build_variables(
                OverlayDarkPalette::BG_PRIMARY,
                OverlayDarkPalette::BG_SURFACE,
                OverlayDarkPalette::TEXT_PRIMARY,
                OverlayDarkPalette::TEXT_SECONDARY,
                OverlayDarkPalette::DIVIDER,
                accent,
            ),
        }
    }

    /// Reader colours are chosen by the user and do not follow the app theme.
    fn reader_css_variables(&self, reader: &ReaderSettings) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("--reader-text-color".into(), css_color(reader.text_color));
        vars.insert("--reader-bg-color".into(), css_color(reader.background_color));
        vars.insert("--reader-font-size".into(), format!("{}px", reader.text_size));
        vars.insert("--reader-indent".into(), format!("{}em", reader.indent_size));
        vars.insert("--reader-paragraph-spacing".into(), format!("{}em", reader.paragraph_spacing));
        vars
    }
}
