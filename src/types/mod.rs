// novelshelf shared types
// Data structures used across managers, services, the loader and the RPC layer.

pub mod download;
pub mod errors;
pub mod navigation;
pub mod novel;
pub mod settings;
