//! novelshelf RPC front end: JSON-RPC over stdin/stdout for a UI shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"novel.load", "params":{"url":"...","formatter_id":1}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Loader callbacks arrive as {"event":"...", ...} lines in between.
//!
//! stdin is read on a helper thread. Every request is dispatched onto the UI
//! queue, which the main thread drains, so request handling and observer
//! callbacks share one thread.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use env_logger::Env;
use log::{error, info};
use serde_json::{json, Value};

use novelshelf::app::{App, EventSink};
use novelshelf::loader::ui_channel;
use novelshelf::platform;
use novelshelf::rpc_handler::handle_method;
use novelshelf::services::formatter::FormatterRegistry;
use novelshelf::services::json_formatter::HttpJsonFormatter;
use novelshelf::services::settings_engine::SettingsEngine;

/// Id of the bundled JSON source formatter.
const JSON_FORMATTER_ID: i32 = 1;

fn emit(value: &Value) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = writeln!(out, "{}", value).and_then(|_| out.flush()) {
        error!("Failed to write to stdout: {}", e);
    }
}

fn respond(app: &Mutex<App>, line: &str) {
    let req: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
            return;
        }
    };

    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
    let params = req.get("params").cloned().unwrap_or(json!({}));

    let response = match handle_method(app, method, &params) {
        Ok(val) => json!({"id": id, "result": val}),
        Err(err) => json!({"id": id, "error": err}),
    };
    emit(&response);
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let (ui, mut queue) = ui_channel();

    let mut formatters = FormatterRegistry::new();
    formatters.register(Arc::new(HttpJsonFormatter::new(JSON_FORMATTER_ID, "JSON source")?));

    let db_path = platform::default_database_path();
    let events: EventSink = Arc::new(|event: Value| emit(&event));
    let app = App::open(
        &db_path.to_string_lossy(),
        SettingsEngine::new(None),
        formatters,
        ui.clone(),
        runtime.handle().clone(),
        events,
    )?;
    let app = Arc::new(Mutex::new(app));
    info!("Database at {}", db_path.display());

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let app = app.clone();
        let stop = stop.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(_) => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                let app = app.clone();
                ui.dispatch(move || respond(&app, &line));
            }
            info!("stdin closed, shutting down");
            ui.dispatch(move || stop.store(true, Ordering::SeqCst));
        });
    }

    while !stop.load(Ordering::SeqCst) && queue.run_next_blocking() {}

    match app.lock() {
        Ok(mut a) => a.shutdown(),
        Err(poisoned) => poisoned.into_inner().shutdown(),
    }
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run() {
        error!("novelshelf failed: {}", e);
        std::process::exit(1);
    }
}
