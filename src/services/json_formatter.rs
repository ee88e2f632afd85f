//! HTTP JSON formatter.
//!
//! Talks to sources that already publish their catalogue as JSON: the novel
//! URL answers with a [`NovelPage`] document and each chapter URL answers
//! with `{"passage": "..."}`. Used by the RPC binary as the built-in source
//! and as the reference for host-provided formatters.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::services::formatter::Formatter;
use crate::types::errors::FetchError;
use crate::types::novel::NovelPage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct PassageDocument {
    passage: String,
}

pub struct HttpJsonFormatter {
    id: i32,
    name: String,
    client: reqwest::Client,
}

impl HttpJsonFormatter {
    pub fn new(id: i32, name: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("novelshelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            id,
            name: name.to_string(),
            client,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

/// Parses a novel document body.
pub fn parse_novel_document(body: &str) -> Result<NovelPage, FetchError> {
    let page: NovelPage =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    if page.title.trim().is_empty() {
        return Err(FetchError::Parse("novel document has no title".to_string()));
    }
    Ok(page)
}

/// Parses a chapter document body.
pub fn parse_passage_document(body: &str) -> Result<String, FetchError> {
    serde_json::from_str::<PassageDocument>(body)
        .map(|doc| doc.passage)
        .map_err(|e| FetchError::Parse(e.to_string()))
}

#[async_trait]
impl Formatter for HttpJsonFormatter {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn parse_novel(&self, novel_url: &str) -> Result<NovelPage, FetchError> {
        let body = self.fetch_text(novel_url).await?;
        parse_novel_document(&body)
    }

    async fn chapter_passage(&self, chapter_url: &str) -> Result<String, FetchError> {
        let body = self.fetch_text(chapter_url).await?;
        parse_passage_document(&body)
    }
}
