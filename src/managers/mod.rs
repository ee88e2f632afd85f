// novelshelf state managers
// Managers handle stateful operations backed by the database: the library and the download queue.

pub mod download_manager;
pub mod library_manager;
