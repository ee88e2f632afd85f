//! Property-based tests for AppSettings persistence.
//!
//! Any settings tree written by the engine reads back unchanged, both as a
//! plain serde round-trip and through the settings file on disk.

use novelshelf::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use novelshelf::types::settings::{
    AdvancedSettings, AppSettings, DownloadSettings, ReaderSettings, ThemeMode,
};
use proptest::prelude::*;
use tempfile::TempDir;

// --- Arbitrary strategies for all settings sub-types ---

fn arb_theme_mode() -> impl Strategy<Value = ThemeMode> {
    prop_oneof![
        Just(ThemeMode::Light),
        Just(ThemeMode::Dark),
        Just(ThemeMode::OverlayDark),
    ]
}

fn arb_reader_settings() -> impl Strategy<Value = ReaderSettings> {
    (any::<u32>(), any::<u32>(), 1u32..=72, 0u32..=5, 0u32..=5, any::<bool>()).prop_map(
        |(text_color, background_color, text_size, paragraph_spacing, indent_size, tap_to_scroll)| {
            ReaderSettings {
                text_color,
                background_color,
                text_size,
                paragraph_spacing,
                indent_size,
                tap_to_scroll,
            }
        },
    )
}

fn arb_download_settings() -> impl Strategy<Value = DownloadSettings> {
    ("/[a-zA-Z0-9_/.-]{1,40}", any::<bool>())
        .prop_map(|(directory, paused)| DownloadSettings { directory, paused })
}

fn arb_app_settings() -> impl Strategy<Value = AppSettings> {
    (arb_reader_settings(), arb_download_settings(), arb_theme_mode()).prop_map(
        |(reader, download, theme_mode)| AppSettings {
            reader,
            download,
            advanced: AdvancedSettings { theme_mode },
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_serialization_roundtrip(settings in arb_app_settings()) {
        let json = serde_json::to_string(&settings)
            .expect("Serialization to JSON should succeed for any AppSettings");

        let deserialized: AppSettings = serde_json::from_str(&json)
            .expect("Deserialization from JSON should succeed for valid JSON");

        prop_assert_eq!(deserialized, settings);
    }

    /// Whatever the generic setter stores survives a restart.
    #[test]
    fn settings_survive_reload(settings in arb_app_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut engine = SettingsEngine::new(Some(path.clone()));
        engine.load().unwrap();
        engine.set_value("reader", serde_json::to_value(&settings.reader).unwrap()).unwrap();
        engine.set_value("download", serde_json::to_value(&settings.download).unwrap()).unwrap();
        engine.set_value("advanced", serde_json::to_value(&settings.advanced).unwrap()).unwrap();

        let mut reloaded = SettingsEngine::new(Some(path));
        prop_assert_eq!(reloaded.load().unwrap(), settings);
    }
}
