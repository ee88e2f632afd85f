//! App Core for novelshelf.
//!
//! Central struct holding the database, settings, formatters, loader wiring
//! and the download queue the RPC front end works against.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::database::connection::Database;
use crate::loader::{LoaderContext, LoaderHandle, RetryAction, UiDispatcher};
use crate::managers::download_manager::DownloadManager;
use crate::services::formatter::FormatterRegistry;
use crate::services::reader_mode::ReaderMode;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::theme_engine::ThemeEngine;

/// Where `{event, ...}` notifications go. The binary prints them to stdout.
pub type EventSink = Arc<dyn Fn(Value) + Send + Sync>;

/// Retry actions offered by error events, keyed by the `retry_id` sent with
/// the event. Shared with the observers, which run outside the `App` lock.
pub type RetryRegistry = Arc<Mutex<HashMap<String, RetryAction>>>;

/// Central application struct.
///
/// LibraryManager is created on demand via `db.connection()` because it
/// borrows the connection with a lifetime parameter.
pub struct App {
    pub db: Arc<Database>,
    pub settings_engine: SettingsEngine,
    pub theme_engine: ThemeEngine,
    pub reader_mode: ReaderMode,
    pub formatters: Arc<FormatterRegistry>,
    pub loader_ctx: LoaderContext,
    pub download_manager: DownloadManager,
    /// Latest load per novel URL.
    pub loads: HashMap<String, LoaderHandle>,
    pub retries: RetryRegistry,
    pub events: EventSink,
}

impl App {
    /// Wires the app together. Settings are loaded here; a malformed settings
    /// file is logged and replaced by defaults.
    pub fn new(
        db: Arc<Database>,
        mut settings_engine: SettingsEngine,
        formatters: FormatterRegistry,
        ui: UiDispatcher,
        runtime: Handle,
        events: EventSink,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = settings_engine.load() {
            warn!("Using default settings: {}", e);
        }
        let theme_engine = ThemeEngine::new(settings_engine.get_settings().advanced.theme_mode);

        let formatters = Arc::new(formatters);
        let loader_ctx = LoaderContext::new(db.clone(), formatters.clone(), ui, runtime);
        let download_manager = DownloadManager::new(db.clone())
            .map_err(|e| format!("DownloadManager init failed: {}", e))?;

        info!("Library ready with {} formatter(s)", formatters.list().len());

        Ok(Self {
            db,
            settings_engine,
            theme_engine,
            reader_mode: ReaderMode::new(),
            formatters,
            loader_ctx,
            download_manager,
            loads: HashMap::new(),
            retries: Arc::new(Mutex::new(HashMap::new())),
            events,
        })
    }

    /// Opens the database at `db_path` and wires the app around it.
    pub fn open(
        db_path: &str,
        settings_engine: SettingsEngine,
        formatters: FormatterRegistry,
        ui: UiDispatcher,
        runtime: Handle,
        events: EventSink,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(Database::open(db_path)?);
        Self::new(db, settings_engine, formatters, ui, runtime, events)
    }

    /// Keeps `handle` as the current load of its novel. The load it replaces
    /// is superseded, and retries offered for the novel are dropped.
    pub fn track_load(&mut self, handle: LoaderHandle) {
        let url = handle.descriptor().novel_url.clone();
        forget_retries(&self.retries, &url);
        if let Some(previous) = self.loads.insert(url, handle) {
            if !previous.is_finished() {
                previous.supersede();
            }
        }
    }

    /// Cancels every unfinished load.
    pub fn shutdown(&mut self) {
        for handle in self.loads.values() {
            if !handle.is_finished() {
                handle.cancel();
            }
        }
        self.loads.clear();
    }
}

/// Drops every retry offered for `novel_url`.
pub fn forget_retries(retries: &RetryRegistry, novel_url: &str) {
    let mut retries = retries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    retries.retain(|_, retry| retry.descriptor().novel_url != novel_url);
}
