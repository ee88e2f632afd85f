//! Schema migrations for the library database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once, in one transaction with its version record.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // journal_mode answers with the resulting mode ("memory" for in-memory databases)
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        apply(conn, 1, "Initial schema: novels and chapters", migration_v1)?;
    }

    if current < 2 {
        apply(conn, 2, "Chapter download queue", migration_v2)?;
    }

    Ok(())
}

/// Runs one migration and records its version in a single transaction.
fn apply(
    conn: &Connection,
    version: i32,
    description: &str,
    migration: fn(&Connection) -> Result<(), rusqlite::Error>,
) -> Result<(), rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    migration(&tx)?;
    record_version(&tx, version, description)?;
    tx.commit()
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: novels and their chapters.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS novels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            formatter_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            image_url TEXT,
            description TEXT NOT NULL DEFAULT '',
            authors TEXT NOT NULL DEFAULT '[]',
            genres TEXT NOT NULL DEFAULT '[]',
            read_status INTEGER NOT NULL DEFAULT 0,
            in_library INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chapters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            novel_id INTEGER NOT NULL,
            link TEXT NOT NULL UNIQUE,
            chapter_num REAL NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            read_status INTEGER NOT NULL DEFAULT 0,
            bookmarked INTEGER NOT NULL DEFAULT 0,
            y_position INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chapters_novel ON chapters(novel_id);
        "
    )
}

/// V2: persisted chapter download queue.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS downloads (
            id TEXT PRIMARY KEY,
            novel_id INTEGER NOT NULL,
            novel_title TEXT NOT NULL,
            chapter_link TEXT NOT NULL UNIQUE,
            chapter_title TEXT NOT NULL,
            formatter_id INTEGER NOT NULL,
            filepath TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            queued_at INTEGER NOT NULL,
            completed_at INTEGER,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_downloads_queued_at ON downloads(queued_at);
        "
    )
}
