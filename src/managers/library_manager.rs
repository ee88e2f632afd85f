//! Library Manager for novelshelf.
//!
//! Implements `LibraryManagerTrait`: the novel and chapter store the loader
//! writes fetched pages into, plus the per-chapter read status, bookmark and
//! scroll position the reader keeps. Backed by SQLite via `rusqlite`.

use rusqlite::{params, Connection, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::errors::LibraryError;
use crate::types::novel::{ChapterRecord, NovelChapter, NovelPage, NovelRecord, ReadStatus};

/// Trait defining library store operations.
pub trait LibraryManagerTrait {
    fn novel_id_from_url(&self, url: &str) -> Result<Option<i64>, LibraryError>;
    fn exists_novel(&self, id: i64) -> Result<bool, LibraryError>;
    /// Inserts a novel and returns its id. Callers check existence first.
    fn add_novel(&mut self, formatter_id: i32, page: &NovelPage, url: &str, status: ReadStatus) -> Result<i64, LibraryError>;
    fn update_novel(&mut self, url: &str, page: &NovelPage) -> Result<(), LibraryError>;
    fn get_novel(&self, url: &str) -> Result<NovelRecord, LibraryError>;
    /// Novels the user added to their library, most recently updated first.
    fn list_library(&self) -> Result<Vec<NovelRecord>, LibraryError>;
    fn set_in_library(&mut self, url: &str, in_library: bool) -> Result<(), LibraryError>;
    fn set_novel_status(&mut self, url: &str, status: ReadStatus) -> Result<(), LibraryError>;
    fn exists_chapter(&self, link: &str) -> Result<bool, LibraryError>;
    fn add_chapter(&mut self, novel_id: i64, chapter: &NovelChapter) -> Result<i64, LibraryError>;
    fn get_chapter(&self, link: &str) -> Result<ChapterRecord, LibraryError>;
    fn list_chapters(&self, novel_id: i64) -> Result<Vec<ChapterRecord>, LibraryError>;
    fn set_chapter_status(&mut self, link: &str, status: ReadStatus) -> Result<(), LibraryError>;
    fn get_bookmark_position(&self, link: &str) -> Result<i64, LibraryError>;
    fn set_bookmark_position(&mut self, link: &str, y: i64) -> Result<(), LibraryError>;
    fn is_bookmarked(&self, link: &str) -> Result<bool, LibraryError>;
    fn set_bookmark(&mut self, link: &str, bookmarked: bool) -> Result<(), LibraryError>;
    /// Flips the chapter's bookmark. Returns `true` when it is now bookmarked.
    fn toggle_bookmark_chapter(&mut self, link: &str) -> Result<bool, LibraryError>;
}

const NOVEL_COLUMNS: &str = "id, url, formatter_id, title, image_url, description, authors, genres, read_status, in_library, updated_at";
const CHAPTER_COLUMNS: &str = "id, novel_id, link, chapter_num, title, read_status, bookmarked, y_position";

/// Library store backed by a SQLite connection.
pub struct LibraryManager<'a> {
    conn: &'a Connection,
}

impl<'a> LibraryManager<'a> {
    /// Creates a new `LibraryManager` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn db_err(e: rusqlite::Error) -> LibraryError {
        LibraryError::DatabaseError(e.to_string())
    }

    fn to_json(list: &[String]) -> String {
        serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
    }

    fn from_json(text: &str) -> Vec<String> {
        serde_json::from_str(text).unwrap_or_default()
    }

    fn row_to_novel(row: &rusqlite::Row) -> rusqlite::Result<NovelRecord> {
        let authors: String = row.get(6)?;
        let genres: String = row.get(7)?;
        Ok(NovelRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            formatter_id: row.get(2)?,
            title: row.get(3)?,
            image_url: row.get(4)?,
            description: row.get(5)?,
            authors: Self::from_json(&authors),
            genres: Self::from_json(&genres),
            status: ReadStatus::from_i32(row.get(8)?),
            in_library: row.get::<_, i32>(9)? != 0,
            updated_at: row.get(10)?,
        })
    }

    fn row_to_chapter(row: &rusqlite::Row) -> rusqlite::Result<ChapterRecord> {
        Ok(ChapterRecord {
            id: row.get(0)?,
            novel_id: row.get(1)?,
            link: row.get(2)?,
            chapter_num: row.get(3)?,
            title: row.get(4)?,
            status: ReadStatus::from_i32(row.get(5)?),
            bookmarked: row.get::<_, i32>(6)? != 0,
            y_position: row.get(7)?,
        })
    }

    /// Runs a single-chapter UPDATE and maps "no row touched" to `ChapterNotFound`.
    fn update_chapter(&self, sql: &str, value: i64, link: &str) -> Result<(), LibraryError> {
        let affected = self
            .conn
            .execute(sql, params![value, link])
            .map_err(Self::db_err)?;
        if affected == 0 {
            return Err(LibraryError::ChapterNotFound(link.to_string()));
        }
        Ok(())
    }

    fn update_novel_column(&self, sql: &str, value: i64, url: &str) -> Result<(), LibraryError> {
        let affected = self
            .conn
            .execute(sql, params![value, Self::now(), url])
            .map_err(Self::db_err)?;
        if affected == 0 {
            return Err(LibraryError::NovelNotFound(url.to_string()));
        }
        Ok(())
    }
}

impl<'a> LibraryManagerTrait for LibraryManager<'a> {
    fn novel_id_from_url(&self, url: &str) -> Result<Option<i64>, LibraryError> {
        self.conn
            .query_row("SELECT id FROM novels WHERE url = ?1", params![url], |row| row.get(0))
            .optional()
            .map_err(Self::db_err)
    }

    fn exists_novel(&self, id: i64) -> Result<bool, LibraryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM novels WHERE id = ?1", params![id], |row| row.get(0))
            .map_err(Self::db_err)?;
        Ok(count > 0)
    }

    fn add_novel(
        &mut self,
        formatter_id: i32,
        page: &NovelPage,
        url: &str,
        status: ReadStatus,
    ) -> Result<i64, LibraryError> {
        self.conn
            .execute(
                "INSERT INTO novels (url, formatter_id, title, image_url, description, authors, genres, read_status, in_library, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
                params![
                    url,
                    formatter_id,
                    page.title,
                    page.image_url,
                    page.description,
                    Self::to_json(&page.authors),
                    Self::to_json(&page.genres),
                    status.as_i32(),
                    Self::now()
                ],
            )
            .map_err(Self::db_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Refreshes the metadata columns. Read status and library membership are kept.
    fn update_novel(&mut self, url: &str, page: &NovelPage) -> Result<(), LibraryError> {
        let affected = self
            .conn
            .execute(
                "UPDATE novels SET title = ?1, image_url = ?2, description = ?3, authors = ?4, genres = ?5, updated_at = ?6 \
                 WHERE url = ?7",
                params![
                    page.title,
                    page.image_url,
                    page.description,
                    Self::to_json(&page.authors),
                    Self::to_json(&page.genres),
                    Self::now(),
                    url
                ],
            )
            .map_err(Self::db_err)?;
        if affected == 0 {
            return Err(LibraryError::NovelNotFound(url.to_string()));
        }
        Ok(())
    }

    fn get_novel(&self, url: &str) -> Result<NovelRecord, LibraryError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM novels WHERE url = ?1", NOVEL_COLUMNS),
                params![url],
                Self::row_to_novel,
            )
            .optional()
            .map_err(Self::db_err)?
            .ok_or_else(|| LibraryError::NovelNotFound(url.to_string()))
    }

    fn list_library(&self) -> Result<Vec<NovelRecord>, LibraryError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM novels WHERE in_library = 1 ORDER BY updated_at DESC, id DESC",
                NOVEL_COLUMNS
            ))
            .map_err(Self::db_err)?;

        let rows = stmt.query_map([], Self::row_to_novel).map_err(Self::db_err)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(Self::db_err)?);
        }
        Ok(results)
    }

    fn set_in_library(&mut self, url: &str, in_library: bool) -> Result<(), LibraryError> {
        self.update_novel_column(
            "UPDATE novels SET in_library = ?1, updated_at = ?2 WHERE url = ?3",
            in_library as i64,
            url,
        )
    }

    fn set_novel_status(&mut self, url: &str, status: ReadStatus) -> Result<(), LibraryError> {
        self.update_novel_column(
            "UPDATE novels SET read_status = ?1, updated_at = ?2 WHERE url = ?3",
            status.as_i32() as i64,
            url,
        )
    }

    fn exists_chapter(&self, link: &str) -> Result<bool, LibraryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chapters WHERE link = ?1", params![link], |row| row.get(0))
            .map_err(Self::db_err)?;
        Ok(count > 0)
    }

    fn add_chapter(&mut self, novel_id: i64, chapter: &NovelChapter) -> Result<i64, LibraryError> {
        if !self.exists_novel(novel_id)? {
            return Err(LibraryError::NovelNotFound(novel_id.to_string()));
        }
        self.conn
            .execute(
                "INSERT INTO chapters (novel_id, link, chapter_num, title) VALUES (?1, ?2, ?3, ?4)",
                params![novel_id, chapter.link, chapter.chapter_num, chapter.title],
            )
            .map_err(Self::db_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_chapter(&self, link: &str) -> Result<ChapterRecord, LibraryError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM chapters WHERE link = ?1", CHAPTER_COLUMNS),
                params![link],
                Self::row_to_chapter,
            )
            .optional()
            .map_err(Self::db_err)?
            .ok_or_else(|| LibraryError::ChapterNotFound(link.to_string()))
    }

    fn list_chapters(&self, novel_id: i64) -> Result<Vec<ChapterRecord>, LibraryError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM chapters WHERE novel_id = ?1 ORDER BY chapter_num, id",
                CHAPTER_COLUMNS
            ))
            .map_err(Self::db_err)?;

        let rows = stmt
            .query_map(params![novel_id], Self::row_to_chapter)
            .map_err(Self::db_err)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(Self::db_err)?);
        }
        Ok(results)
    }

    fn set_chapter_status(&mut self, link: &str, status: ReadStatus) -> Result<(), LibraryError> {
        self.update_chapter(
            "UPDATE chapters SET read_status = ?1 WHERE link = ?2",
            status.as_i32() as i64,
            link,
        )
    }

    fn get_bookmark_position(&self, link: &str) -> Result<i64, LibraryError> {
        self.conn
            .query_row(
                "SELECT y_position FROM chapters WHERE link = ?1",
                params![link],
                |row| row.get(0),
            )
            .optional()
            .map_err(Self::db_err)?
            .ok_or_else(|| LibraryError::ChapterNotFound(link.to_string()))
    }

    fn set_bookmark_position(&mut self, link: &str, y: i64) -> Result<(), LibraryError> {
        self.update_chapter("UPDATE chapters SET y_position = ?1 WHERE link = ?2", y, link)
    }

    fn is_bookmarked(&self, link: &str) -> Result<bool, LibraryError> {
        let flag: Option<i32> = self
            .conn
            .query_row(
                "SELECT bookmarked FROM chapters WHERE link = ?1",
                params![link],
                |row| row.get(0),
            )
            .optional()
            .map_err(Self::db_err)?;
        flag.map(|f| f != 0)
            .ok_or_else(|| LibraryError::ChapterNotFound(link.to_string()))
    }

    fn set_bookmark(&mut self, link: &str, bookmarked: bool) -> Result<(), LibraryError> {
        self.update_chapter(
            "UPDATE chapters SET bookmarked = ?1 WHERE link = ?2",
            bookmarked as i64,
            link,
        )
    }

    fn toggle_bookmark_chapter(&mut self, link: &str) -> Result<bool, LibraryError> {
        let next = !self.is_bookmarked(link)?;
        self.set_bookmark(link, next)?;
        Ok(next)
    }
}
