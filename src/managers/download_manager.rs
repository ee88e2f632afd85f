//! Chapter Download Manager for novelshelf.
//!
//! Keeps a queue of chapters to save for offline reading, persisted in
//! SQLite with an in-memory cache. The queue is drained one chapter at a
//! time and stops handing out work while downloads are paused.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rusqlite::params;
use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::formatter::FormatterRegistry;
use crate::types::download::{ChapterDownload, DownloadStatus};
use crate::types::errors::DownloadError;
use crate::types::novel::{ChapterRecord, NovelRecord};

/// Trait defining download queue operations.
pub trait DownloadManagerTrait {
    /// Queues a chapter. Queuing the same chapter twice returns the existing id.
    fn enqueue(&mut self, novel: &NovelRecord, chapter: &ChapterRecord) -> Result<String, DownloadError>;
    fn list_downloads(&self) -> Vec<&ChapterDownload>;
    fn get_download(&self, id: &str) -> Option<&ChapterDownload>;
    fn retry_download(&mut self, id: &str) -> Result<(), DownloadError>;
    fn remove_download(&mut self, id: &str) -> Result<(), DownloadError>;
    /// Oldest pending entry, or `None` while `paused`.
    fn next_pending(&self, paused: bool) -> Option<&ChapterDownload>;
}

fn status_to_str(s: &DownloadStatus) -> String {
    match s {
        DownloadStatus::Pending => "pending".to_string(),
        DownloadStatus::InProgress => "in_progress".to_string(),
        DownloadStatus::Completed => "completed".to_string(),
        DownloadStatus::Failed(msg) => format!("failed:{}", msg),
    }
}

fn str_to_status(s: &str) -> DownloadStatus {
    match s {
        "in_progress" => DownloadStatus::InProgress,
        "completed" => DownloadStatus::Completed,
        other => match other.strip_prefix("failed:") {
            Some(msg) => DownloadStatus::Failed(msg.to_string()),
            None => DownloadStatus::Pending,
        },
    }
}

/// Strips characters that are not allowed in file names.
pub fn sanitize_name(s: &str) -> String {
    s.replace([':', '/', '\\', '?', '*', '"', '<', '>', '|'], "")
        // Keep this last to remove duplicate spaces
        .replace("  ", " ")
        .trim()
        .to_string()
}

/// Where a downloaded chapter is written under `dir`.
pub fn chapter_path(dir: &Path, item: &ChapterDownload) -> PathBuf {
    let chapter = if item.chapter_title.trim().is_empty() {
        item.chapter_link.rsplit('/').find(|s| !s.is_empty()).unwrap_or("chapter").to_string()
    } else {
        item.chapter_title.clone()
    };
    dir.join(sanitize_name(&item.novel_title))
        .join(format!("{}.txt", sanitize_name(&chapter)))
}

/// Download queue backed by SQLite with in-memory cache.
pub struct DownloadManager {
    db: Arc<Database>,
    downloads: Vec<ChapterDownload>,
}

impl DownloadManager {
    pub fn new(db: Arc<Database>) -> Result<Self, DownloadError> {
        let mut mgr = Self {
            db,
            downloads: Vec::new(),
        };
        mgr.load_from_db()?;
        Ok(mgr)
    }

    fn load_from_db(&mut self) -> Result<(), DownloadError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT id, novel_id, novel_title, chapter_link, chapter_title, formatter_id, filepath, status, queued_at, completed_at \
                 FROM downloads ORDER BY queued_at, rowid",
            )
            .map_err(|e| DownloadError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let status_str: String = row.get(7)?;
                Ok(ChapterDownload {
                    id: row.get(0)?,
                    novel_id: row.get(1)?,
                    novel_title: row.get(2)?,
                    chapter_link: row.get(3)?,
                    chapter_title: row.get(4)?,
                    formatter_id: row.get(5)?,
                    filepath: row.get(6)?,
                    status: str_to_status(&status_str),
                    queued_at: row.get(8)?,
                    completed_at: row.get(9)?,
                })
            })
            .map_err(|e| DownloadError::DatabaseError(e.to_string()))?;

        let mut loaded = Vec::new();
        for row in rows {
            loaded.push(row.map_err(|e| DownloadError::DatabaseError(e.to_string()))?);
        }
        // Anything left in progress belongs to a run that was interrupted.
        for item in loaded.iter_mut() {
            if item.status == DownloadStatus::InProgress {
                item.status = DownloadStatus::Pending;
            }
        }
        self.downloads = loaded;
        Ok(())
    }

    fn now_ts() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
    }

    fn find_index(&self, id: &str) -> Result<usize, DownloadError> {
        self.downloads.iter().position(|d| d.id == id)
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    fn persist(&self, item: &ChapterDownload) -> Result<(), DownloadError> {
        self.db.connection().execute(
            "INSERT OR REPLACE INTO downloads (id, novel_id, novel_title, chapter_link, chapter_title, formatter_id, filepath, status, queued_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id, item.novel_id, item.novel_title, item.chapter_link,
                item.chapter_title, item.formatter_id, item.filepath,
                status_to_str(&item.status), item.queued_at, item.completed_at
            ],
        ).map_err(|e| DownloadError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn set_status(&mut self, idx: usize, status: DownloadStatus) -> Result<(), DownloadError> {
        self.downloads[idx].status = status;
        let item = self.downloads[idx].clone();
        self.persist(&item)
    }

    /// Downloads the next pending chapter into `dir`.
    ///
    /// Returns the id of the entry it worked on, or `None` when the queue is
    /// empty or paused. A failed fetch or write marks the entry `Failed` and
    /// is returned as an error.
    pub async fn download_next(
        &mut self,
        formatters: &FormatterRegistry,
        dir: &Path,
        paused: bool,
    ) -> Result<Option<String>, DownloadError> {
        let item = match self.next_pending(paused) {
            Some(item) => item.clone(),
            None => return Ok(None),
        };
        let idx = self.find_index(&item.id)?;
        self.set_status(idx, DownloadStatus::InProgress)?;
        debug!("Downloading {} ({})", item.chapter_link, item.novel_title);

        let result = match formatters.get(item.formatter_id) {
            Some(formatter) => formatter
                .chapter_passage(&item.chapter_link)
                .await
                .map_err(|e| DownloadError::NetworkError(e.to_string())),
            None => Err(DownloadError::NetworkError(format!(
                "no formatter registered with id {}",
                item.formatter_id
            ))),
        };

        let written = match result {
            Ok(passage) => {
                let path = chapter_path(dir, &item);
                write_chapter(&path, &passage).await.map(|_| path)
            }
            Err(e) => Err(e),
        };

        let idx = self.find_index(&item.id)?;
        match written {
            Ok(path) => {
                self.downloads[idx].filepath = Some(path.to_string_lossy().to_string());
                self.downloads[idx].completed_at = Some(Self::now_ts());
                self.set_status(idx, DownloadStatus::Completed)?;
                info!("Downloaded {} to {}", item.chapter_link, path.display());
                Ok(Some(item.id))
            }
            Err(e) => {
                warn!("Download of {} failed: {}", item.chapter_link, e);
                self.set_status(idx, DownloadStatus::Failed(e.to_string()))?;
                Err(e)
            }
        }
    }
}

async fn write_chapter(path: &Path, passage: &str) -> Result<(), DownloadError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::FileSystemError(e.to_string()))?;
    }
    tokio::fs::write(path, passage)
        .await
        .map_err(|e| DownloadError::FileSystemError(e.to_string()))
}

impl DownloadManagerTrait for DownloadManager {
    fn enqueue(&mut self, novel: &NovelRecord, chapter: &ChapterRecord) -> Result<String, DownloadError> {
        if let Some(existing) = self.downloads.iter().find(|d| d.chapter_link == chapter.link) {
            return Ok(existing.id.clone());
        }

        let item = ChapterDownload {
            id: Uuid::new_v4().to_string(),
            novel_id: novel.id,
            novel_title: novel.title.clone(),
            chapter_link: chapter.link.clone(),
            chapter_title: chapter.title.clone(),
            formatter_id: novel.formatter_id,
            filepath: None,
            status: DownloadStatus::Pending,
            queued_at: Self::now_ts(),
            completed_at: None,
        };

        self.persist(&item)?;
        let id = item.id.clone();
        self.downloads.push(item);
        Ok(id)
    }

    fn list_downloads(&self) -> Vec<&ChapterDownload> {
        self.downloads.iter().collect()
    }

    fn get_download(&self, id: &str) -> Option<&ChapterDownload> {
        self.downloads.iter().find(|d| d.id == id)
    }

    fn retry_download(&mut self, id: &str) -> Result<(), DownloadError> {
        let idx = self.find_index(id)?;
        match &self.downloads[idx].status {
            DownloadStatus::Failed(_) => self.set_status(idx, DownloadStatus::Pending),
            DownloadStatus::Completed => Err(DownloadError::AlreadyCompleted(id.to_string())),
            _ => Ok(()),
        }
    }

    /// Drops the entry and deletes its saved chapter file, if any.
    fn remove_download(&mut self, id: &str) -> Result<(), DownloadError> {
        let idx = self.find_index(id)?;
        if let Some(path) = &self.downloads[idx].filepath {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Deleted {}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(DownloadError::FileSystemError(format!("{}: {}", path, e))),
            }
        }
        self.db
            .connection()
            .execute("DELETE FROM downloads WHERE id = ?1", params![id])
            .map_err(|e| DownloadError::DatabaseError(e.to_string()))?;
        self.downloads.remove(idx);
        Ok(())
    }

    fn next_pending(&self, paused: bool) -> Option<&ChapterDownload> {
        if paused {
            return None;
        }
        self.downloads.iter().find(|d| d.status == DownloadStatus::Pending)
    }
}
