//! novelshelf: library and reader core for a novel-reading application.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod loader;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
