use serde::{Deserialize, Serialize};

/// A screen the UI shell should open. The core never opens screens itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavigationIntent {
    /// Open the chapter reader.
    Reader {
        title: String,
        chapter_url: String,
        novel_url: String,
        formatter_id: i32,
    },
    /// Open the URL in the in-app web view.
    WebView { url: String },
    /// Hand the URL to the system browser.
    Browser { url: String },
}
