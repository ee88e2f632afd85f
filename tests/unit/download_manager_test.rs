//! Unit tests for the chapter download queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use novelshelf::database::Database;
use novelshelf::managers::download_manager::{DownloadManager, DownloadManagerTrait};
use novelshelf::managers::library_manager::{LibraryManager, LibraryManagerTrait};
use novelshelf::services::formatter::{Formatter, FormatterRegistry};
use novelshelf::types::download::DownloadStatus;
use novelshelf::types::errors::{DownloadError, FetchError};
use novelshelf::types::novel::{ChapterRecord, NovelChapter, NovelPage, NovelRecord, ReadStatus};

const NOVEL_URL: &str = "https://novels.test/re-zero";

struct PassageFormatter {
    failing: AtomicBool,
}

#[async_trait]
impl Formatter for PassageFormatter {
    fn id(&self) -> i32 {
        1
    }

    fn name(&self) -> &str {
        "passages"
    }

    async fn parse_novel(&self, _novel_url: &str) -> Result<NovelPage, FetchError> {
        Err(FetchError::Parse("not used".to_string()))
    }

    async fn chapter_passage(&self, chapter_url: &str) -> Result<String, FetchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status(503));
        }
        Ok(format!("Passage of {}", chapter_url))
    }
}

/// Stores a novel "Re:Zero" with `chapters` chapters and returns its records.
fn seed(db: &Database, chapters: u32) -> (NovelRecord, Vec<ChapterRecord>) {
    let conn = db.connection();
    let mut library = LibraryManager::new(&conn);
    let page = NovelPage {
        title: "Re:Zero".to_string(),
        ..NovelPage::default()
    };
    let id = library.add_novel(1, &page, NOVEL_URL, ReadStatus::Unread).unwrap();
    for n in 1..=chapters {
        library
            .add_chapter(id, &NovelChapter {
                link: format!("{}/{}", NOVEL_URL, n),
                chapter_num: n as f64,
                title: format!("Arc 1: Chapter {}", n),
            })
            .unwrap();
    }
    (library.get_novel(NOVEL_URL).unwrap(), library.list_chapters(id).unwrap())
}

fn registry(failing: bool) -> FormatterRegistry {
    let mut formatters = FormatterRegistry::new();
    formatters.register(Arc::new(PassageFormatter {
        failing: AtomicBool::new(failing),
    }));
    formatters
}

#[test]
fn test_enqueue_and_list() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 2);
    let mut mgr = DownloadManager::new(db).unwrap();

    let first = mgr.enqueue(&novel, &chapters[0]).unwrap();
    let second = mgr.enqueue(&novel, &chapters[1]).unwrap();

    let listed = mgr.list_downloads();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first);
    assert_eq!(listed[1].id, second);
    assert_eq!(listed[0].status, DownloadStatus::Pending);
    assert_eq!(listed[0].novel_title, "Re:Zero");
}

#[test]
fn test_enqueue_same_chapter_twice_returns_existing() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 1);
    let mut mgr = DownloadManager::new(db).unwrap();

    let a = mgr.enqueue(&novel, &chapters[0]).unwrap();
    let b = mgr.enqueue(&novel, &chapters[0]).unwrap();

    assert_eq!(a, b);
    assert_eq!(mgr.list_downloads().len(), 1);
}

#[test]
fn test_queue_persists_across_instances() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 1);
    let id = {
        let mut mgr = DownloadManager::new(db.clone()).unwrap();
        mgr.enqueue(&novel, &chapters[0]).unwrap()
    };

    let mgr = DownloadManager::new(db).unwrap();
    let item = mgr.get_download(&id).expect("download reloaded from the database");
    assert_eq!(item.chapter_link, chapters[0].link);
}

#[test]
fn test_next_pending_honours_pause() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 2);
    let mut mgr = DownloadManager::new(db).unwrap();
    let first = mgr.enqueue(&novel, &chapters[0]).unwrap();
    mgr.enqueue(&novel, &chapters[1]).unwrap();

    assert!(mgr.next_pending(true).is_none());
    assert_eq!(mgr.next_pending(false).unwrap().id, first);
}

#[test]
fn test_remove_and_missing_ids() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 1);
    let mut mgr = DownloadManager::new(db.clone()).unwrap();
    let id = mgr.enqueue(&novel, &chapters[0]).unwrap();

    mgr.remove_download(&id).unwrap();
    assert!(mgr.get_download(&id).is_none());
    assert!(matches!(mgr.remove_download(&id), Err(DownloadError::NotFound(_))));
    assert!(matches!(mgr.retry_download("missing"), Err(DownloadError::NotFound(_))));

    let rows: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM downloads", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn test_download_next_writes_chapter_file() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 1);
    let mut mgr = DownloadManager::new(db).unwrap();
    let id = mgr.enqueue(&novel, &chapters[0]).unwrap();

    let done = mgr.download_next(&registry(false), dir.path(), false).await.unwrap();

    assert_eq!(done.as_deref(), Some(id.as_str()));
    let item = mgr.get_download(&id).unwrap();
    assert_eq!(item.status, DownloadStatus::Completed);
    assert!(item.completed_at.is_some());
    let expected = dir.path().join("ReZero").join("Arc 1 Chapter 1.txt");
    assert_eq!(item.filepath.as_deref(), Some(&*expected.to_string_lossy()));
    let written = std::fs::read_to_string(&expected).unwrap();
    assert_eq!(written, format!("Passage of {}/1", NOVEL_URL));

    // Nothing left to do.
    assert_eq!(mgr.download_next(&registry(false), dir.path(), false).await.unwrap(), None);
}

#[tokio::test]
async fn test_download_next_does_nothing_while_paused() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 1);
    let mut mgr = DownloadManager::new(db).unwrap();
    let id = mgr.enqueue(&novel, &chapters[0]).unwrap();

    assert_eq!(mgr.download_next(&registry(false), dir.path(), true).await.unwrap(), None);
    assert_eq!(mgr.get_download(&id).unwrap().status, DownloadStatus::Pending);
}

#[tokio::test]
async fn test_failed_download_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 1);
    let mut mgr = DownloadManager::new(db).unwrap();
    let id = mgr.enqueue(&novel, &chapters[0]).unwrap();

    let result = mgr.download_next(&registry(true), dir.path(), false).await;
    assert!(matches!(result, Err(DownloadError::NetworkError(_))));
    assert!(matches!(mgr.get_download(&id).unwrap().status, DownloadStatus::Failed(_)));
    assert!(mgr.next_pending(false).is_none());

    mgr.retry_download(&id).unwrap();
    assert_eq!(mgr.get_download(&id).unwrap().status, DownloadStatus::Pending);

    mgr.download_next(&registry(false), dir.path(), false).await.unwrap();
    assert_eq!(mgr.get_download(&id).unwrap().status, DownloadStatus::Completed);
    assert!(matches!(mgr.retry_download(&id), Err(DownloadError::AlreadyCompleted(_))));
}

#[tokio::test]
async fn test_remove_deletes_saved_chapter_file() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (novel, chapters) = seed(&db, 2);
    let mut mgr = DownloadManager::new(db).unwrap();
    let saved = mgr.enqueue(&novel, &chapters[0]).unwrap();
    mgr.download_next(&registry(false), dir.path(), false).await.unwrap();
    let path = std::path::PathBuf::from(mgr.get_download(&saved).unwrap().filepath.clone().unwrap());
    assert!(path.exists());

    mgr.remove_download(&saved).unwrap();
    assert!(!path.exists());

    // A pending entry has no file to delete.
    let pending = mgr.enqueue(&novel, &chapters[1]).unwrap();
    mgr.remove_download(&pending).unwrap();
    assert!(mgr.list_downloads().is_empty());
}
