//! Library database layer.
//!
//! Provides SQLite connection management and schema migrations.
//!
//! # Usage
//!
//! ```no_run
//! use novelshelf::database::Database;
//! use novelshelf::managers::library_manager::{LibraryManager, LibraryManagerTrait};
//!
//! let db = Database::open("novelshelf.db").expect("failed to open database");
//! let conn = db.connection();
//! let library = LibraryManager::new(&conn);
//! let novels = library.list_library().expect("query failed");
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
