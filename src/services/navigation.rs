//! Navigation: turns user actions into intents for the UI shell.

use log::info;

use crate::managers::library_manager::LibraryManagerTrait;
use crate::types::errors::LibraryError;
use crate::types::navigation::NavigationIntent;
use crate::types::novel::{ChapterRecord, ReadStatus};

/// Marks `chapter` as being read and returns the intent that opens the reader on it.
pub fn open_chapter<L: LibraryManagerTrait>(
    library: &mut L,
    chapter: &ChapterRecord,
    novel_url: &str,
    formatter_id: i32,
) -> Result<NavigationIntent, LibraryError> {
    library.set_chapter_status(&chapter.link, ReadStatus::Reading)?;
    info!("Opening chapter {}", chapter.link);
    Ok(NavigationIntent::Reader {
        title: chapter.title.clone(),
        chapter_url: chapter.link.clone(),
        novel_url: novel_url.to_string(),
        formatter_id,
    })
}

pub fn open_in_webview(url: &str) -> NavigationIntent {
    NavigationIntent::WebView { url: url.to_string() }
}

pub fn open_in_browser(url: &str) -> NavigationIntent {
    NavigationIntent::Browser { url: url.to_string() }
}
