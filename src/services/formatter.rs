//! Source formatters.
//!
//! A formatter knows one web source: it turns a novel URL into a
//! [`NovelPage`] and a chapter URL into its passage text. Formatters are
//! supplied by the host and looked up by their stable numeric id, which is
//! also what the library stores next to each novel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::errors::FetchError;
use crate::types::novel::NovelPage;

#[async_trait]
pub trait Formatter: Send + Sync {
    /// Stable identifier persisted with every novel from this source.
    fn id(&self) -> i32;

    fn name(&self) -> &str;

    async fn parse_novel(&self, novel_url: &str) -> Result<NovelPage, FetchError>;

    async fn chapter_passage(&self, chapter_url: &str) -> Result<String, FetchError>;
}

/// Formatters available to loaders, keyed by id.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: HashMap<i32, Arc<dyn Formatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a formatter, replacing any previous one with the same id.
    pub fn register(&mut self, formatter: Arc<dyn Formatter>) {
        self.formatters.insert(formatter.id(), formatter);
    }

    pub fn get(&self, id: i32) -> Option<Arc<dyn Formatter>> {
        self.formatters.get(&id).cloned()
    }

    /// (id, name) pairs sorted by id.
    pub fn list(&self) -> Vec<(i32, String)> {
        let mut entries: Vec<(i32, String)> = self
            .formatters
            .values()
            .map(|f| (f.id(), f.name().to_string()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
