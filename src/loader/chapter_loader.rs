//! Chapter list loader, chained after a full-view novel load.

use log::warn;
use tokio::task::JoinHandle;

use crate::loader::{LoaderContext, NovelView};
use crate::managers::library_manager::{LibraryManager, LibraryManagerTrait};
use crate::types::errors::{LibraryError, LoaderError};
use crate::types::novel::{ChapterRecord, NovelDescriptor};

/// Reads the stored chapters of a novel and hands them to the view.
pub struct ChapterLoader {
    descriptor: NovelDescriptor,
    view: NovelView,
}

impl ChapterLoader {
    pub fn new(descriptor: NovelDescriptor, view: NovelView) -> Self {
        Self { descriptor, view }
    }

    /// Resolves to the number of chapters rendered.
    pub fn spawn(self, ctx: &LoaderContext) -> JoinHandle<Result<usize, LoaderError>> {
        let ctx = ctx.clone();
        ctx.runtime.clone().spawn(async move {
            let db = ctx.db.clone();
            let url = self.descriptor.novel_url.clone();
            let chapters = tokio::task::spawn_blocking(move || -> Result<Vec<ChapterRecord>, LibraryError> {
                let conn = db.connection();
                let library = LibraryManager::new(&conn);
                let novel_id = library
                    .novel_id_from_url(&url)?
                    .ok_or_else(|| LibraryError::NovelNotFound(url.clone()))?;
                library.list_chapters(novel_id)
            })
            .await
            .map_err(|e| LoaderError::Worker(e.to_string()))?;

            let chapters = chapters.map_err(|e| {
                warn!("Chapter list for {} unavailable: {}", self.descriptor.novel_url, e);
                LoaderError::Store(e)
            })?;

            let count = chapters.len();
            let observer = self.view.observer().clone();
            ctx.ui.dispatch(move || observer.render_chapters(&chapters));
            Ok(count)
        })
    }
}
