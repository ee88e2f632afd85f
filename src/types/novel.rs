use serde::{Deserialize, Serialize};

/// Reading progress of a novel or chapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReadStatus {
    #[default]
    Unread,
    Reading,
    Read,
}

impl ReadStatus {
    /// Integer form stored in the database.
    pub fn as_i32(&self) -> i32 {
        match self {
            ReadStatus::Unread => 0,
            ReadStatus::Reading => 1,
            ReadStatus::Read => 2,
        }
    }

    /// Unknown values fall back to `Unread`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => ReadStatus::Reading,
            2 => ReadStatus::Read,
            _ => ReadStatus::Unread,
        }
    }
}

/// Identifies what a loader fetches. Immutable once a loader holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NovelDescriptor {
    pub novel_url: String,
    pub chapter_url: Option<String>,
    pub formatter_id: i32,
}

impl NovelDescriptor {
    pub fn new(novel_url: impl Into<String>, formatter_id: i32) -> Self {
        Self {
            novel_url: novel_url.into(),
            chapter_url: None,
            formatter_id,
        }
    }

    pub fn with_chapter(mut self, chapter_url: impl Into<String>) -> Self {
        self.chapter_url = Some(chapter_url.into());
        self
    }
}

/// A chapter entry as returned by a formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelChapter {
    pub link: String,
    /// Display number; may be fractional for side chapters.
    pub chapter_num: f64,
    #[serde(default)]
    pub title: String,
}

/// A novel page as returned by a formatter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NovelPage {
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub chapters: Vec<NovelChapter>,
}

/// A novel row in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelRecord {
    pub id: i64,
    pub url: String,
    pub formatter_id: i32,
    pub title: String,
    pub image_url: Option<String>,
    pub description: String,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    pub status: ReadStatus,
    pub in_library: bool,
    pub updated_at: i64,
}

/// A chapter row in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: i64,
    pub novel_id: i64,
    pub link: String,
    pub chapter_num: f64,
    pub title: String,
    pub status: ReadStatus,
    pub bookmarked: bool,
    pub y_position: i64,
}
