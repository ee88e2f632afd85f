use std::fmt;

// === SettingsError ===

/// Errors related to settings load/save operations.
#[derive(Debug)]
pub enum SettingsError {
    /// Reading or writing the settings file failed.
    IoError(String),
    /// The settings file could not be parsed or produced.
    SerializationError(String),
    /// The dot-notation key does not name a setting.
    InvalidKey(String),
    /// The value is out of range or of the wrong type for its key.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings IO error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

// === LibraryError ===

/// Errors raised by the novel/chapter library store.
#[derive(Debug)]
pub enum LibraryError {
    /// No novel is stored under the given URL or id.
    NovelNotFound(String),
    /// No chapter is stored under the given link.
    ChapterNotFound(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::NovelNotFound(key) => write!(f, "Novel not found: {}", key),
            LibraryError::ChapterNotFound(link) => write!(f, "Chapter not found: {}", link),
            LibraryError::DatabaseError(msg) => write!(f, "Library database error: {}", msg),
        }
    }
}

impl std::error::Error for LibraryError {}

// === FetchError ===

/// Errors a formatter reports while fetching a source page.
///
/// Every variant is recoverable: the loader offers a retry.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request never produced a response.
    Network(String),
    /// The source answered with a non-success HTTP status.
    Status(u16),
    /// The response body could not be turned into novel data.
    Parse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Status(code) => write!(f, "Source responded with HTTP {}", code),
            FetchError::Parse(msg) => write!(f, "Failed to parse source page: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

// === LoaderError ===

/// Errors ending a novel load.
#[derive(Debug)]
pub enum LoaderError {
    /// The formatter failed to fetch the novel.
    Fetch(FetchError),
    /// Persisting the fetched novel failed.
    Store(LibraryError),
    /// No formatter is registered under the descriptor's id.
    UnknownFormatter(i32),
    /// The load was cancelled before it completed.
    Cancelled,
    /// The worker task panicked or was aborted.
    Worker(String),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Fetch(e) => write!(f, "{}", e),
            LoaderError::Store(e) => write!(f, "{}", e),
            LoaderError::UnknownFormatter(id) => write!(f, "No formatter registered with id {}", id),
            LoaderError::Cancelled => write!(f, "Loading was cancelled"),
            LoaderError::Worker(msg) => write!(f, "Loader worker failed: {}", msg),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoaderError::Fetch(e) => Some(e),
            LoaderError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FetchError> for LoaderError {
    fn from(e: FetchError) -> Self {
        LoaderError::Fetch(e)
    }
}

impl From<LibraryError> for LoaderError {
    fn from(e: LibraryError) -> Self {
        LoaderError::Store(e)
    }
}

// === DownloadError ===

/// Errors related to chapter download operations.
#[derive(Debug)]
pub enum DownloadError {
    /// Download with the given ID was not found.
    NotFound(String),
    /// Fetching the chapter passage failed.
    NetworkError(String),
    /// Writing the chapter file failed.
    FileSystemError(String),
    /// Database operation failed.
    DatabaseError(String),
    /// The download has already completed.
    AlreadyCompleted(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::NotFound(id) => write!(f, "Download not found: {}", id),
            DownloadError::NetworkError(msg) => write!(f, "Download network error: {}", msg),
            DownloadError::FileSystemError(msg) => {
                write!(f, "Download file system error: {}", msg)
            }
            DownloadError::DatabaseError(msg) => write!(f, "Download database error: {}", msg),
            DownloadError::AlreadyCompleted(id) => {
                write!(f, "Download already completed: {}", id)
            }
        }
    }
}

impl std::error::Error for DownloadError {}

// === ReaderError ===

/// Errors related to reader formatting.
#[derive(Debug, PartialEq)]
pub enum ReaderError {
    /// The chapter passage has no readable text.
    EmptyPassage,
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::EmptyPassage => write!(f, "Chapter passage is empty"),
        }
    }
}

impl std::error::Error for ReaderError {}

// === ThemeError ===

/// Errors related to theme management.
#[derive(Debug)]
pub enum ThemeError {
    /// The provided color value is invalid.
    InvalidColor(String),
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeError::InvalidColor(color) => write!(f, "Invalid color: {}", color),
        }
    }
}

impl std::error::Error for ThemeError {}
