//! What a loader reports to the UI.

use std::sync::Arc;

use crate::loader::RetryAction;
use crate::types::novel::{ChapterRecord, NovelPage};

/// A view that displays one novel. All methods are called on the UI thread.
pub trait NovelObserver: Send + Sync {
    fn show_progress(&self);
    fn hide_progress(&self);
    fn hide_error(&self);
    /// Shows `message` on the error surface; `retry` re-runs the failed load.
    fn show_error(&self, message: &str, retry: RetryAction);
    /// Sets the shared title bar.
    fn set_title(&self, title: &str);
    fn render(&self, page: &NovelPage);
    /// Renders the stored chapter list. Views without a chapter list ignore it.
    fn render_chapters(&self, _chapters: &[ChapterRecord]) {}
}

/// The screen a loader reports to, chosen when the loader is built.
#[derive(Clone)]
pub enum NovelView {
    /// The full novel screen: info plus chapter list.
    Full(Arc<dyn NovelObserver>),
    /// The info panel on its own, refreshed by pull-to-refresh.
    InfoPanel(Arc<dyn NovelObserver>),
}

impl NovelView {
    pub fn observer(&self) -> &Arc<dyn NovelObserver> {
        match self {
            NovelView::Full(observer) | NovelView::InfoPanel(observer) => observer,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NovelView::Full(_) => "full",
            NovelView::InfoPanel(_) => "info_panel",
        }
    }
}
