//! Novel loading.
//!
//! A [`NovelLoader`] fetches one novel through its formatter on the tokio
//! runtime, stores it in the library, and reports back to a [`NovelView`].
//! Every observer call goes through the [`UiDispatcher`]; the worker itself
//! never touches the view.
//!
//! ```text
//! Created -> Running -> Succeeded | Failed | Cancelled
//! ```

pub mod chapter_loader;
pub mod dispatch;
pub mod observer;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::database::Database;
use crate::managers::library_manager::{LibraryManager, LibraryManagerTrait};
use crate::services::formatter::FormatterRegistry;
use crate::types::errors::{LibraryError, LoaderError};
use crate::types::novel::{NovelDescriptor, NovelPage, ReadStatus};

pub use chapter_loader::ChapterLoader;
pub use dispatch::{ui_channel, UiDispatcher, UiQueue};
pub use observer::{NovelObserver, NovelView};

/// Lifecycle of one loader run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Created,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl LoaderState {
    fn as_u8(self) -> u8 {
        match self {
            LoaderState::Created => 0,
            LoaderState::Running => 1,
            LoaderState::Succeeded => 2,
            LoaderState::Failed => 3,
            LoaderState::Cancelled => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoaderState::Running,
            2 => LoaderState::Succeeded,
            3 => LoaderState::Failed,
            4 => LoaderState::Cancelled,
            _ => LoaderState::Created,
        }
    }
}

/// Everything a loader needs besides its descriptor and view.
#[derive(Clone)]
pub struct LoaderContext {
    pub db: Arc<Database>,
    pub formatters: Arc<FormatterRegistry>,
    pub ui: UiDispatcher,
    pub runtime: Handle,
}

impl LoaderContext {
    pub fn new(db: Arc<Database>, formatters: Arc<FormatterRegistry>, ui: UiDispatcher, runtime: Handle) -> Self {
        Self {
            db,
            formatters,
            ui,
            runtime,
        }
    }
}

/// Loads one novel for one view.
#[derive(Clone)]
pub struct NovelLoader {
    descriptor: NovelDescriptor,
    view: NovelView,
    load_all: bool,
}

impl NovelLoader {
    pub fn new(descriptor: NovelDescriptor, view: NovelView, load_all: bool) -> Self {
        Self {
            descriptor,
            view,
            load_all,
        }
    }

    /// Full screen: loads the novel and then its chapter list.
    pub fn for_full_view(descriptor: NovelDescriptor, observer: Arc<dyn NovelObserver>) -> Self {
        Self::new(descriptor, NovelView::Full(observer), true)
    }

    /// Info panel refresh: loads the novel only.
    pub fn for_info_panel(descriptor: NovelDescriptor, observer: Arc<dyn NovelObserver>) -> Self {
        Self::new(descriptor, NovelView::InfoPanel(observer), false)
    }

    pub fn descriptor(&self) -> &NovelDescriptor {
        &self.descriptor
    }

    pub fn view(&self) -> &NovelView {
        &self.view
    }

    pub fn load_all(&self) -> bool {
        self.load_all
    }

    /// Fetches and stores the novel without touching the view.
    pub async fn run(&self, ctx: &LoaderContext) -> Result<NovelPage, LoaderError> {
        let never_cancelled = Arc::new(AtomicBool::new(false));
        fetch_and_store(&self.descriptor, ctx, &never_cancelled).await
    }

    /// Starts the load on the runtime and returns a handle to it.
    ///
    /// Progress is shown through the UI queue before the worker starts.
    pub fn spawn(self, ctx: &LoaderContext) -> LoaderHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let silenced = Arc::new(AtomicBool::new(false));
        let state = Arc::new(AtomicU8::new(LoaderState::Created.as_u8()));
        let descriptor = self.descriptor.clone();

        let observer = self.view.observer().clone();
        ctx.ui.dispatch(move || observer.show_progress());

        let task = {
            let ctx = ctx.clone();
            let flags = Flags {
                cancelled: cancelled.clone(),
                silenced: silenced.clone(),
                state: state.clone(),
            };
            ctx.runtime.clone().spawn(async move {
                flags.state.store(LoaderState::Running.as_u8(), Ordering::SeqCst);

                let observer = self.view.observer().clone();
                let silenced = flags.silenced.clone();
                ctx.ui.dispatch(move || {
                    if !silenced.load(Ordering::SeqCst) {
                        observer.hide_error();
                    }
                });

                let result = fetch_and_store(&self.descriptor, &ctx, &flags.cancelled).await;
                self.complete(result, &ctx, flags)
            })
        };

        LoaderHandle {
            descriptor,
            cancelled,
            silenced,
            state,
            task,
        }
    }

    /// Decides the final state and hands the result to the UI thread.
    ///
    /// The state is stored before the hand-off. If a cancel lands after that,
    /// the UI job sees it, skips the result and downgrades the state to
    /// `Cancelled`.
    fn complete(self, result: Result<NovelPage, LoaderError>, ctx: &LoaderContext, flags: Flags) -> LoaderState {
        let outcome = if flags.cancelled.load(Ordering::SeqCst) || matches!(result, Err(LoaderError::Cancelled)) {
            LoaderState::Cancelled
        } else if result.is_ok() {
            LoaderState::Succeeded
        } else {
            LoaderState::Failed
        };
        flags.state.store(outcome.as_u8(), Ordering::SeqCst);

        match (&outcome, &result) {
            (LoaderState::Succeeded, Ok(page)) => debug!("Loaded novel: {}", page.title),
            (LoaderState::Failed, Err(e)) => {
                warn!("Failed to load {}: {}", self.descriptor.novel_url, e)
            }
            _ => info!("Load of {} cancelled", self.descriptor.novel_url),
        }

        let retry = RetryAction {
            loader: self.clone(),
            ctx: ctx.clone(),
        };
        let chain_ctx = ctx.clone();

        ctx.ui.dispatch(move || {
            if flags.silenced.load(Ordering::SeqCst) {
                flags.state.store(LoaderState::Cancelled.as_u8(), Ordering::SeqCst);
                return;
            }
            let observer = self.view.observer();
            observer.hide_progress();
            if flags.cancelled.load(Ordering::SeqCst) {
                flags.state.store(LoaderState::Cancelled.as_u8(), Ordering::SeqCst);
                return;
            }
            match result {
                Ok(page) if outcome == LoaderState::Succeeded => {
                    observer.set_title(&page.title);
                    observer.render(&page);
                    if self.load_all {
                        ChapterLoader::new(self.descriptor.clone(), self.view.clone()).spawn(&chain_ctx);
                    }
                }
                Err(e) if outcome == LoaderState::Failed => {
                    observer.show_error(&e.to_string(), retry);
                }
                _ => {}
            }
        });

        outcome
    }
}

/// Shared between a spawned loader and its handle.
struct Flags {
    cancelled: Arc<AtomicBool>,
    silenced: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
}

/// Builds a fresh loader for the same descriptor and view.
pub fn retry(descriptor: &NovelDescriptor, view: &NovelView, load_all: bool) -> NovelLoader {
    NovelLoader::new(descriptor.clone(), view.clone(), load_all)
}

/// Attached to an error so the view can re-run the failed load.
#[derive(Clone)]
pub struct RetryAction {
    loader: NovelLoader,
    ctx: LoaderContext,
}

impl RetryAction {
    pub fn descriptor(&self) -> &NovelDescriptor {
        self.loader.descriptor()
    }

    /// Spawns a new loader with the failed one's descriptor and view.
    pub fn invoke(&self) -> LoaderHandle {
        info!("Retrying {}", self.loader.descriptor.novel_url);
        retry(&self.loader.descriptor, &self.loader.view, self.loader.load_all).spawn(&self.ctx)
    }
}

/// Handle to a spawned loader.
pub struct LoaderHandle {
    descriptor: NovelDescriptor,
    cancelled: Arc<AtomicBool>,
    silenced: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    task: JoinHandle<LoaderState>,
}

impl LoaderHandle {
    pub fn descriptor(&self) -> &NovelDescriptor {
        &self.descriptor
    }

    /// Suppresses persistence still pending and the UI update. The view still
    /// gets `hide_progress`. An in-flight request is not interrupted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cancels a load that a newer load of the same novel replaces. Unlike
    /// [`cancel`](Self::cancel) it makes no further observer calls at all, so
    /// it cannot hide the newer load's progress.
    pub fn supersede(&self) {
        self.silenced.store(true, Ordering::SeqCst);
        self.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LoaderState {
        LoaderState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the worker and returns the state it stored.
    ///
    /// A cancel that lands after the worker decided is only seen by the UI
    /// job, which downgrades [`state`](Self::state) to `Cancelled` once the
    /// UI queue runs it.
    pub async fn join(self) -> LoaderState {
        match self.task.await {
            Ok(_) => LoaderState::from_u8(self.state.load(Ordering::SeqCst)),
            Err(e) => {
                error!("Loader task for {} died: {}", self.descriptor.novel_url, e);
                LoaderState::Failed
            }
        }
    }
}

async fn fetch_and_store(
    descriptor: &NovelDescriptor,
    ctx: &LoaderContext,
    cancelled: &Arc<AtomicBool>,
) -> Result<NovelPage, LoaderError> {
    let formatter = ctx
        .formatters
        .get(descriptor.formatter_id)
        .ok_or(LoaderError::UnknownFormatter(descriptor.formatter_id))?;

    debug!("Loading {}", descriptor.novel_url);
    let page = formatter.parse_novel(&descriptor.novel_url).await?;

    if cancelled.load(Ordering::SeqCst) {
        return Err(LoaderError::Cancelled);
    }

    let db = ctx.db.clone();
    let url = descriptor.novel_url.clone();
    let formatter_id = descriptor.formatter_id;
    let stored = page.clone();
    let flag = cancelled.clone();
    tokio::task::spawn_blocking(move || persist_page(&db, formatter_id, &url, &stored, &flag))
        .await
        .map_err(|e| LoaderError::Worker(e.to_string()))?
        .map_err(|e| {
            error!("Failed to store {}: {}", descriptor.novel_url, e);
            LoaderError::Store(e)
        })?;

    Ok(page)
}

/// Updates the novel if it is stored, inserts it as unread otherwise, then
/// inserts every chapter not yet stored. Stops adding chapters once
/// `cancelled` is set; what was written so far is kept.
pub fn persist_page(
    db: &Database,
    formatter_id: i32,
    url: &str,
    page: &NovelPage,
    cancelled: &AtomicBool,
) -> Result<i64, LibraryError> {
    let conn = db.connection();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| LibraryError::DatabaseError(e.to_string()))?;

    let novel_id = {
        let mut library = LibraryManager::new(&tx);
        let novel_id = match library.novel_id_from_url(url)? {
            Some(id) => {
                library.update_novel(url, page)?;
                id
            }
            None => library.add_novel(formatter_id, page, url, ReadStatus::Unread)?,
        };

        for chapter in &page.chapters {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            if !library.exists_chapter(&chapter.link)? {
                library.add_chapter(novel_id, chapter)?;
            }
        }
        novel_id
    };

    tx.commit()
        .map_err(|e| LibraryError::DatabaseError(e.to_string()))?;
    Ok(novel_id)
}
