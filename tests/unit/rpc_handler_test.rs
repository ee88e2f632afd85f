//! Unit tests for the RPC handler: the JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests exercise the methods through the same code path used by the
//! `novelshelf` binary: a temp settings file, an in-memory library, a mock
//! source formatter and the test thread standing in for the UI thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::runtime::Runtime;

use novelshelf::app::{App, EventSink};
use novelshelf::database::Database;
use novelshelf::loader::{ui_channel, UiQueue};
use novelshelf::rpc_handler::handle_method;
use novelshelf::services::formatter::{Formatter, FormatterRegistry};
use novelshelf::services::settings_engine::SettingsEngine;
use novelshelf::types::errors::FetchError;
use novelshelf::types::novel::{NovelChapter, NovelPage};

const NOVEL_URL: &str = "https://novels.test/super-supportive";

struct MockSource {
    failing: Arc<AtomicBool>,
    slow: Arc<AtomicBool>,
}

#[async_trait]
impl Formatter for MockSource {
    fn id(&self) -> i32 {
        1
    }

    fn name(&self) -> &str {
        "mock source"
    }

    async fn parse_novel(&self, _novel_url: &str) -> Result<NovelPage, FetchError> {
        if self.slow.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status(503));
        }
        Ok(NovelPage {
            title: "Super Supportive".to_string(),
            chapters: (1..=2)
                .map(|n| NovelChapter {
                    link: format!("{}/{}", NOVEL_URL, n),
                    chapter_num: n as f64,
                    title: format!("Chapter {}", n),
                })
                .collect(),
            ..NovelPage::default()
        })
    }

    async fn chapter_passage(&self, _chapter_url: &str) -> Result<String, FetchError> {
        Ok("Hero stood up.\nThen sat down.".to_string())
    }
}

struct Fixture {
    app: Mutex<App>,
    queue: UiQueue,
    events: Arc<Mutex<Vec<Value>>>,
    failing: Arc<AtomicBool>,
    slow: Arc<AtomicBool>,
    tmp: TempDir,
    _runtime: Runtime,
}

/// Create a fresh App backed by a temp settings file and in-memory DB.
fn setup() -> Fixture {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let runtime = Runtime::new().unwrap();
    let failing = Arc::new(AtomicBool::new(false));
    let slow = Arc::new(AtomicBool::new(false));

    let mut formatters = FormatterRegistry::new();
    formatters.register(Arc::new(MockSource {
        failing: failing.clone(),
        slow: slow.clone(),
    }));

    let events: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink: EventSink = {
        let events = events.clone();
        Arc::new(move |event: Value| events.lock().unwrap().push(event))
    };

    let settings_path = tmp.path().join("settings.json").to_string_lossy().to_string();
    let (ui, queue) = ui_channel();
    let app = App::new(
        Arc::new(Database::open_in_memory().unwrap()),
        SettingsEngine::new(Some(settings_path)),
        formatters,
        ui,
        runtime.handle().clone(),
        sink,
    )
    .expect("Failed to init App");

    Fixture {
        app: Mutex::new(app),
        queue,
        events,
        failing,
        slow,
        tmp,
        _runtime: runtime,
    }
}

impl Fixture {
    fn call(&self, method: &str, params: Value) -> Result<Value, String> {
        handle_method(&self.app, method, &params)
    }

    fn has_event(&self, name: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e["event"] == name)
    }

    fn event(&self, name: &str) -> Value {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e["event"] == name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Pumps the UI queue until an event named `name` has been emitted.
    fn pump_until_event(&mut self, name: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.has_event(name) {
            self.queue.run_pending();
            assert!(Instant::now() < deadline, "no '{}' event in time", name);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn count_events(&self, matches: impl Fn(&Value) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(e)).count()
    }

    fn retry_count(&self) -> usize {
        self.app.lock().unwrap().retries.lock().unwrap().len()
    }

    /// Pumps until the tracked load of the mock novel has finished.
    fn pump_until_load_finished(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let finished = self
                .app
                .lock()
                .unwrap()
                .loads
                .get(NOVEL_URL)
                .map_or(true, |handle| handle.is_finished());
            if finished {
                break;
            }
            self.queue.run_pending();
            assert!(Instant::now() < deadline, "load did not finish in time");
            std::thread::sleep(Duration::from_millis(5));
        }
        self.queue.run_pending();
    }

    /// Loads the mock novel in the full view and waits for its chapter list.
    fn load_novel(&mut self) {
        let res = self
            .call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1}))
            .unwrap();
        assert_eq!(res["loading"], true);
        self.pump_until_event("chapters");
    }
}

// ─── Basics ───

#[test]
fn test_ping() {
    let f = setup();
    assert_eq!(f.call("ping", json!({})).unwrap(), json!({"pong": true}));
}

#[test]
fn test_unknown_method_returns_error() {
    let f = setup();
    let res = f.call("nonexistent.method", json!({}));
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Settings ───

#[test]
fn test_settings_get_defaults() {
    let f = setup();
    let settings = f.call("settings.get", json!({})).unwrap();
    assert_eq!(settings["reader"]["text_size"], 14);
    assert_eq!(settings["reader"]["text_color"], 0xFF00_0000u32);
    assert_eq!(settings["advanced"]["theme_mode"], "Light");
    assert_eq!(settings["download"]["paused"], false);
}

#[test]
fn test_settings_toggles_and_reset() {
    let f = setup();
    assert_eq!(f.call("settings.toggle_pause", json!({})).unwrap()["paused"], true);
    assert_eq!(f.call("settings.toggle_tap_to_scroll", json!({})).unwrap()["tap_to_scroll"], true);
    assert_eq!(f.call("settings.toggle_pause", json!({})).unwrap()["paused"], false);

    f.call("settings.set", json!({"key": "reader.text_size", "value": 20})).unwrap();
    assert_eq!(f.call("settings.get", json!({})).unwrap()["reader"]["text_size"], 20);
    assert!(f.tmp.path().join("settings.json").exists());

    f.call("settings.reset", json!({})).unwrap();
    let settings = f.call("settings.get", json!({})).unwrap();
    assert_eq!(settings["reader"]["text_size"], 14);
    assert_eq!(settings["reader"]["tap_to_scroll"], false);
}

#[test]
fn test_settings_set_rejects_bad_key() {
    let f = setup();
    assert!(f.call("settings.set", json!({"key": "reader.font", "value": "serif"})).is_err());
    assert!(f.call("settings.set", json!({"key": "reader.text_size"})).is_err());
    assert!(f.call("settings.set", json!({"key": "reader.text_size", "value": 0})).is_err());
    assert!(f
        .call("settings.set", json!({"key": "reader.paragraph_spacing", "value": u32::MAX}))
        .is_err());
}

#[test]
fn test_set_theme() {
    let f = setup();
    let res = f.call("settings.set_theme", json!({"index": 1})).unwrap();
    assert_eq!(res["theme_mode"], 1);
    assert_eq!(res["style"], "Theme.MaterialComponents.NoActionBar");
    assert_eq!(res["css"]["--bg-primary"], "#121212");

    let err = f.call("settings.set_theme", json!({"index": 3})).unwrap_err();
    assert!(err.contains("Invalid settings value"));
    assert_eq!(f.call("settings.get", json!({})).unwrap()["advanced"]["theme_mode"], "Dark");
}

#[test]
fn test_swap_reader_color() {
    let f = setup();
    let res = f.call("settings.swap_reader_color", json!({})).unwrap();
    assert_eq!(res["night_mode"], true);
    assert_eq!(res["css"]["--reader-bg-color"], "#000000");
    let res = f.call("settings.swap_reader_color", json!({})).unwrap();
    assert_eq!(res["night_mode"], false);
}

// ─── Loading & library ───

#[test]
fn test_novel_load_emits_events_and_stores() {
    let mut f = setup();
    f.load_novel();

    assert_eq!(f.event("progress")["visible"], false);
    assert_eq!(f.event("title")["title"], "Super Supportive");
    assert_eq!(f.event("novel")["page"]["chapters"].as_array().unwrap().len(), 2);
    assert_eq!(f.event("chapters")["view"], "full");

    let chapters = f.call("library.chapters", json!({"url": NOVEL_URL})).unwrap();
    assert_eq!(chapters["items"].as_array().unwrap().len(), 2);
}

#[test]
fn test_novel_load_rejects_unknown_view() {
    let f = setup();
    let err = f
        .call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1, "view": "grid"}))
        .unwrap_err();
    assert!(err.contains("unknown view"));
}

#[test]
fn test_library_add_and_list() {
    let mut f = setup();
    f.load_novel();

    assert!(f.call("library.list", json!({})).unwrap()["items"].as_array().unwrap().is_empty());
    f.call("library.add", json!({"url": NOVEL_URL})).unwrap();

    let list = f.call("library.list", json!({})).unwrap();
    let items = list["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Super Supportive");
}

#[test]
fn test_library_grid_columns() {
    let f = setup();
    let res = f.call("library.grid_columns", json!({"width_px": 1440, "density": 2.0})).unwrap();
    assert_eq!(res["columns"], 4);
    let res = f.call("library.grid_columns", json!({"width_px": 100})).unwrap();
    assert_eq!(res["columns"], 1);
    assert!(f.call("library.grid_columns", json!({"width_px": -5})).is_err());
}

#[test]
fn test_failed_load_then_retry() {
    let mut f = setup();
    f.failing.store(true, Ordering::SeqCst);

    f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1, "view": "info_panel"}))
        .unwrap();
    f.pump_until_event("error");
    let error = f.event("error");
    assert_eq!(error["message"], "Source responded with HTTP 503");
    let retry_id = error["retry_id"].as_str().unwrap().to_string();

    f.failing.store(false, Ordering::SeqCst);
    let res = f.call("novel.retry", json!({"retry_id": retry_id})).unwrap();
    assert_eq!(res["url"], NOVEL_URL);
    f.pump_until_event("novel");

    // A retry id is single use.
    assert!(f.call("novel.retry", json!({"retry_id": retry_id})).is_err());
}

#[test]
fn test_retries_do_not_pile_up() {
    let mut f = setup();
    f.failing.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1, "view": "info_panel"}))
            .unwrap();
        f.pump_until_load_finished();
        assert_eq!(f.retry_count(), 1);
    }
    let stale = f.event("error")["retry_id"].as_str().unwrap().to_string();

    f.failing.store(false, Ordering::SeqCst);
    f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1, "view": "info_panel"}))
        .unwrap();
    f.pump_until_load_finished();

    assert_eq!(f.retry_count(), 0);
    assert!(f.call("novel.retry", json!({"retry_id": stale})).is_err());
}

#[test]
fn test_new_load_supersedes_unfinished_one() {
    let mut f = setup();
    f.slow.store(true, Ordering::SeqCst);

    f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1, "view": "info_panel"}))
        .unwrap();
    f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1, "view": "info_panel"}))
        .unwrap();
    assert_eq!(f.app.lock().unwrap().loads.len(), 1);
    f.pump_until_event("novel");
    f.pump_until_load_finished();
    std::thread::sleep(Duration::from_millis(50));
    f.queue.run_pending();

    assert_eq!(f.count_events(|e| e["event"] == "novel"), 1);
    assert_eq!(f.count_events(|e| e["event"] == "progress" && e["visible"] == false), 1);
}

#[test]
fn test_novel_cancel() {
    let mut f = setup();
    f.slow.store(true, Ordering::SeqCst);

    f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 1})).unwrap();
    let res = f.call("novel.cancel", json!({"url": NOVEL_URL})).unwrap();
    assert_eq!(res["cancelled"], true);
    f.pump_until_load_finished();

    assert_eq!(f.count_events(|e| e["event"] == "progress" && e["visible"] == false), 1);
    assert!(!f.has_event("novel"));
    assert!(!f.has_event("error"));
    let res = f.call("novel.cancel", json!({"url": NOVEL_URL})).unwrap();
    assert_eq!(res["cancelled"], false);
}

#[test]
fn test_novel_load_rejects_out_of_range_formatter_id() {
    let f = setup();
    let res = f.call("novel.load", json!({"url": NOVEL_URL, "formatter_id": 4_294_967_297_i64}));
    assert!(res.unwrap_err().contains("formatter_id"));
    assert!(f.app.lock().unwrap().loads.is_empty());
}

// ─── Chapters ───

#[test]
fn test_chapter_bookmark_and_open() {
    let mut f = setup();
    f.load_novel();
    let link = format!("{}/1", NOVEL_URL);

    assert_eq!(f.call("chapter.toggle_bookmark", json!({"link": link})).unwrap()["bookmarked"], true);
    assert_eq!(f.call("chapter.toggle_bookmark", json!({"link": link})).unwrap()["bookmarked"], false);

    let intent = f.call("chapter.open", json!({"novel_url": NOVEL_URL, "link": link})).unwrap();
    assert_eq!(intent["action"], "reader");
    assert_eq!(intent["chapter_url"], link);
    assert_eq!(intent["formatter_id"], 1);

    let chapters = f.call("library.chapters", json!({"url": NOVEL_URL})).unwrap();
    assert_eq!(chapters["items"][0]["status"], "Reading");
}

#[test]
fn test_chapter_open_unknown_chapter() {
    let mut f = setup();
    f.load_novel();
    let err = f
        .call("chapter.open", json!({"novel_url": NOVEL_URL, "link": "https://novels.test/nope"}))
        .unwrap_err();
    assert!(err.contains("Chapter not found"));
}

#[test]
fn test_chapter_format() {
    let f = setup();
    let res = f
        .call("chapter.format", json!({"title": "One", "text": "First.\nSecond."}))
        .unwrap();
    assert_eq!(res["text"], "    First.\n\n    Second.");
    assert!(res["html"].as_str().unwrap().contains("<p>Second.</p>"));
    assert!(f.call("chapter.format", json!({"text": "   "})).is_err());
}

// ─── Downloads ───

#[test]
fn test_download_enqueue_list_and_next() {
    let mut f = setup();
    f.load_novel();
    let download_dir = f.tmp.path().join("downloads").to_string_lossy().to_string();
    f.call("settings.set", json!({"key": "download.directory", "value": download_dir})).unwrap();

    let link = format!("{}/2", NOVEL_URL);
    let id = f.call("download.enqueue", json!({"novel_url": NOVEL_URL, "link": link})).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let list = f.call("download.list", json!({})).unwrap();
    assert_eq!(list["items"].as_array().unwrap().len(), 1);
    assert_eq!(list["paused"], false);

    f.call("settings.toggle_pause", json!({})).unwrap();
    assert_eq!(f.call("download.next", json!({})).unwrap()["id"], Value::Null);

    f.call("settings.toggle_pause", json!({})).unwrap();
    assert_eq!(f.call("download.next", json!({})).unwrap()["id"], id);
    let file = f.tmp.path().join("downloads").join("Super Supportive").join("Chapter 2.txt");
    assert!(file.exists());

    f.call("download.remove", json!({"id": id})).unwrap();
    assert!(f.call("download.list", json!({})).unwrap()["items"].as_array().unwrap().is_empty());
}
