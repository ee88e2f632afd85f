//! RPC method handler for the novelshelf JSON-RPC protocol.
//!
//! Kept apart from `main.rs` so it can be unit-tested independently.
//! `handle_method` dispatches JSON-RPC method calls to the managers and
//! services held by `App`. Loader progress reaches the client as event
//! lines through [`EventObserver`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::debug;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::{forget_retries, App, EventSink, RetryRegistry};
use crate::loader::{NovelLoader, NovelObserver, RetryAction};
use crate::managers::download_manager::DownloadManagerTrait;
use crate::managers::library_manager::{LibraryManager, LibraryManagerTrait};
use crate::services::navigation;
use crate::services::reader_mode::ReaderModeTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::services::theme_engine::{grid_columns, ThemeEngineTrait};
use crate::types::novel::{ChapterRecord, NovelDescriptor, NovelPage};

/// Observer that turns loader callbacks into `{event, ...}` lines.
pub struct EventObserver {
    novel_url: String,
    view: &'static str,
    events: EventSink,
    retries: RetryRegistry,
}

impl EventObserver {
    pub fn new(novel_url: &str, view: &'static str, events: EventSink, retries: RetryRegistry) -> Self {
        Self {
            novel_url: novel_url.to_string(),
            view,
            events,
            retries,
        }
    }

    fn emit(&self, event: &str, mut body: Value) {
        if let Some(map) = body.as_object_mut() {
            map.insert("event".into(), json!(event));
            map.insert("novel_url".into(), json!(self.novel_url));
            map.insert("view".into(), json!(self.view));
        }
        (self.events)(body);
    }
}

impl NovelObserver for EventObserver {
    fn show_progress(&self) {
        self.emit("progress", json!({"visible": true}));
    }

    fn hide_progress(&self) {
        self.emit("progress", json!({"visible": false}));
    }

    fn hide_error(&self) {
        self.emit("error_cleared", json!({}));
    }

    fn show_error(&self, message: &str, retry: RetryAction) {
        let retry_id = Uuid::new_v4().to_string();
        forget_retries(&self.retries, &self.novel_url);
        self.retries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(retry_id.clone(), retry);
        self.emit("error", json!({"message": message, "retry_id": retry_id}));
    }

    fn set_title(&self, title: &str) {
        self.emit("title", json!({"title": title}));
    }

    fn render(&self, page: &NovelPage) {
        forget_retries(&self.retries, &self.novel_url);
        self.emit("novel", json!({"page": page}));
    }

    fn render_chapters(&self, chapters: &[ChapterRecord]) {
        self.emit("chapters", json!({"chapters": chapters}));
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params.get(key).and_then(|v| v.as_str()).ok_or_else(|| format!("missing {}", key))
}

fn int_param(params: &Value, key: &str) -> Result<i64, String> {
    params.get(key).and_then(|v| v.as_i64()).ok_or_else(|| format!("missing {}", key))
}

/// Width of one library grid cell, in density-independent pixels.
const LIBRARY_COLUMN_DP: f32 = 180.0;

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// Must be called from the UI thread, outside the tokio runtime.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    debug!("rpc {}", method);
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let settings = a.settings_engine.get_settings();
            let json_val = serde_json::to_value(settings).map_err(|e| e.to_string())?;
            Ok(json_val)
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            if key == "advanced.theme_mode" {
                let mode = a.settings_engine.get_settings().advanced.theme_mode;
                a.theme_engine.set_theme(mode);
            }
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.reset().map_err(|e| e.to_string())?;
            let mode = a.settings_engine.get_settings().advanced.theme_mode;
            a.theme_engine.set_theme(mode);
            Ok(json!({"ok": true}))
        }
        "settings.toggle_tap_to_scroll" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let enabled = a.settings_engine.toggle_tap_to_scroll().map_err(|e| e.to_string())?;
            Ok(json!({"tap_to_scroll": enabled}))
        }
        "settings.toggle_pause" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let paused = a.settings_engine.toggle_pause().map_err(|e| e.to_string())?;
            Ok(json!({"paused": paused}))
        }
        "settings.set_theme" => {
            let index = int_param(params, "index")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let mode = a.settings_engine.change_theme_mode(index).map_err(|e| e.to_string())?;
            a.theme_engine.set_theme(mode);
            Ok(json!({
                "theme_mode": mode.index(),
                "style": a.theme_engine.style_name(),
                "css": a.theme_engine.get_css_variables(),
            }))
        }
        "settings.swap_reader_color" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.swap_reader_color().map_err(|e| e.to_string())?;
            let reader = &a.settings_engine.get_settings().reader;
            Ok(json!({
                "night_mode": a.settings_engine.is_reader_night_mode(),
                "css": a.theme_engine.reader_css_variables(reader),
            }))
        }

        // ─── Library ───
        "library.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let conn = a.db.connection();
            let library = LibraryManager::new(&conn);
            let novels = library.list_library().map_err(|e| e.to_string())?;
            Ok(json!({"items": novels}))
        }
        "library.add" | "library.remove" => {
            let url = str_param(params, "url")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let conn = a.db.connection();
            let mut library = LibraryManager::new(&conn);
            library.set_in_library(url, method == "library.add").map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "library.grid_columns" => {
            let width = int_param(params, "width_px")?;
            let width = u32::try_from(width).map_err(|_| "width_px must be positive".to_string())?;
            let density = params.get("density").and_then(|v| v.as_f64()).unwrap_or(1.0) as f32;
            Ok(json!({"columns": grid_columns(width, density, LIBRARY_COLUMN_DP)}))
        }
        "library.chapters" => {
            let url = str_param(params, "url")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let conn = a.db.connection();
            let library = LibraryManager::new(&conn);
            let novel = library.get_novel(url).map_err(|e| e.to_string())?;
            let chapters = library.list_chapters(novel.id).map_err(|e| e.to_string())?;
            Ok(json!({"items": chapters}))
        }

        // ─── Chapters ───
        "chapter.toggle_bookmark" => {
            let link = str_param(params, "link")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let conn = a.db.connection();
            let mut library = LibraryManager::new(&conn);
            let bookmarked = library.toggle_bookmark_chapter(link).map_err(|e| e.to_string())?;
            Ok(json!({"bookmarked": bookmarked}))
        }
        "chapter.set_position" => {
            let link = str_param(params, "link")?;
            let y = int_param(params, "y")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let conn = a.db.connection();
            let mut library = LibraryManager::new(&conn);
            library.set_bookmark_position(link, y).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "chapter.open" => {
            let novel_url = str_param(params, "novel_url")?;
            let link = str_param(params, "link")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let conn = a.db.connection();
            let mut library = LibraryManager::new(&conn);
            let novel = library.get_novel(novel_url).map_err(|e| e.to_string())?;
            let chapter = library.get_chapter(link).map_err(|e| e.to_string())?;
            let intent = navigation::open_chapter(&mut library, &chapter, novel_url, novel.formatter_id)
                .map_err(|e| e.to_string())?;
            serde_json::to_value(intent).map_err(|e| e.to_string())
        }
        "chapter.format" => {
            let text = str_param(params, "text")?;
            let title = params.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let a = app.lock().map_err(|e| e.to_string())?;
            let reader = &a.settings_engine.get_settings().reader;
            let plain = a.reader_mode.format_passage(text, reader).map_err(|e| e.to_string())?;
            let html = a.reader_mode.format_for_display(title, text, reader).map_err(|e| e.to_string())?;
            Ok(json!({"text": plain, "html": html, "minutes": a.reader_mode.estimate_read_time(text)}))
        }
        "open.webview" => {
            let url = str_param(params, "url")?;
            serde_json::to_value(navigation::open_in_webview(url)).map_err(|e| e.to_string())
        }
        "open.browser" => {
            let url = str_param(params, "url")?;
            serde_json::to_value(navigation::open_in_browser(url)).map_err(|e| e.to_string())
        }

        // ─── Loading ───
        "novel.load" => {
            let url = str_param(params, "url")?;
            let formatter_id = i32::try_from(int_param(params, "formatter_id")?)
                .map_err(|_| "formatter_id out of range".to_string())?;
            let view = params.get("view").and_then(|v| v.as_str()).unwrap_or("full");
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let descriptor = NovelDescriptor::new(url, formatter_id);
            let loader = match view {
                "full" => {
                    let observer = EventObserver::new(url, "full", a.events.clone(), a.retries.clone());
                    NovelLoader::for_full_view(descriptor, Arc::new(observer))
                }
                "info_panel" => {
                    let observer = EventObserver::new(url, "info_panel", a.events.clone(), a.retries.clone());
                    NovelLoader::for_info_panel(descriptor, Arc::new(observer))
                }
                other => return Err(format!("unknown view: {}", other)),
            };
            let handle = loader.spawn(&a.loader_ctx);
            a.track_load(handle);
            Ok(json!({"loading": true, "view": view}))
        }
        "novel.retry" => {
            let retry_id = str_param(params, "retry_id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let retry = a
                .retries
                .lock()
                .map_err(|e| e.to_string())?
                .remove(retry_id)
                .ok_or_else(|| format!("unknown retry id: {}", retry_id))?;
            let handle = retry.invoke();
            let url = handle.descriptor().novel_url.clone();
            a.track_load(handle);
            Ok(json!({"loading": true, "url": url}))
        }
        "novel.cancel" => {
            let url = str_param(params, "url")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            match a.loads.get(url) {
                Some(handle) if !handle.is_finished() => {
                    handle.cancel();
                    Ok(json!({"cancelled": true}))
                }
                _ => Ok(json!({"cancelled": false})),
            }
        }

        // ─── Downloads ───
        "download.enqueue" => {
            let novel_url = str_param(params, "novel_url")?;
            let link = str_param(params, "link")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let (novel, chapter) = {
                let conn = a.db.connection();
                let library = LibraryManager::new(&conn);
                let novel = library.get_novel(novel_url).map_err(|e| e.to_string())?;
                let chapter = library.get_chapter(link).map_err(|e| e.to_string())?;
                (novel, chapter)
            };
            let id = a.download_manager.enqueue(&novel, &chapter).map_err(|e| e.to_string())?;
            Ok(json!({"id": id}))
        }
        "download.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let items: Vec<Value> = a
                .download_manager
                .list_downloads()
                .iter()
                .map(|d| json!(d))
                .collect();
            Ok(json!({"items": items, "paused": a.settings_engine.is_download_paused()}))
        }
        "download.retry" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.download_manager.retry_download(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "download.remove" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.download_manager.remove_download(id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "download.next" => {
            let mut guard = app.lock().map_err(|e| e.to_string())?;
            let a = &mut *guard;
            let settings = a.settings_engine.get_settings();
            let dir = PathBuf::from(&settings.download.directory);
            let paused = settings.download.paused;
            let formatters = a.formatters.clone();
            let runtime = a.loader_ctx.runtime.clone();
            let id = runtime
                .block_on(a.download_manager.download_next(&formatters, &dir, paused))
                .map_err(|e| e.to_string())?;
            Ok(json!({"id": id}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
