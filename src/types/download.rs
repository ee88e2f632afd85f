use serde::{Deserialize, Serialize};

/// Status of a chapter download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadStatus {
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

/// A queued chapter download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDownload {
    pub id: String,
    pub novel_id: i64,
    pub novel_title: String,
    pub chapter_link: String,
    pub chapter_title: String,
    pub formatter_id: i32,
    pub filepath: Option<String>,
    pub status: DownloadStatus,
    pub queued_at: i64,
    pub completed_at: Option<i64>,
}
