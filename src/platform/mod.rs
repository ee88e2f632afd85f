// novelshelf platform paths
// Config: settings.json lives here.
// Data:   the SQLite library and downloaded chapters live here.
//
// Both can be redirected with NOVELSHELF_CONFIG_DIR / NOVELSHELF_DATA_DIR,
// which the RPC host and the tests use to keep state out of the user's home.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "novelshelf";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

#[cfg(target_os = "windows")]
fn base_config_dir() -> PathBuf {
    PathBuf::from(
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming")),
    )
}

#[cfg(target_os = "windows")]
fn base_data_dir() -> PathBuf {
    base_config_dir()
}

#[cfg(target_os = "macos")]
fn base_config_dir() -> PathBuf {
    home_dir().join("Library").join("Application Support")
}

#[cfg(target_os = "macos")]
fn base_data_dir() -> PathBuf {
    base_config_dir()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn base_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_dir().join(".config"),
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn base_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_dir().join(".local").join("share"),
    }
}

/// Returns the configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/novelshelf` or `~/.config/novelshelf`
/// - **macOS**: `~/Library/Application Support/novelshelf`
/// - **Windows**: `%APPDATA%/novelshelf`
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var("NOVELSHELF_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    base_config_dir().join(APP_DIR)
}

/// Returns the data directory.
///
/// - **Linux**: `$XDG_DATA_HOME/novelshelf` or `~/.local/share/novelshelf`
/// - **macOS**: `~/Library/Application Support/novelshelf`
/// - **Windows**: `%APPDATA%/novelshelf`
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("NOVELSHELF_DATA_DIR") {
        return PathBuf::from(dir);
    }
    base_data_dir().join(APP_DIR)
}

/// Default chapter download directory, used until the user picks one.
pub fn default_download_dir() -> PathBuf {
    get_data_dir().join("downloads")
}

/// Default library database path.
pub fn default_database_path() -> PathBuf {
    get_data_dir().join("novelshelf.db")
}
