//! Reader Mode for novelshelf.
//!
//! Lays out a chapter passage for reading: paragraph indentation and
//! spacing from the reader settings, plus an HTML rendition styled with the
//! reader colours for webview-based shells.

use crate::types::errors::ReaderError;
use crate::types::settings::{ReaderSettings, MAX_INDENT_SIZE, MAX_PARAGRAPH_SPACING};

/// Spaces per indent level in plain-text output.
const INDENT_WIDTH: usize = 4;

/// Trait defining reader mode operations.
pub trait ReaderModeTrait {
    fn format_passage(&self, text: &str, settings: &ReaderSettings) -> Result<String, ReaderError>;
    fn format_for_display(&self, title: &str, text: &str, settings: &ReaderSettings) -> Result<String, ReaderError>;
    fn estimate_read_time(&self, text: &str) -> u32;
}

/// Reader mode implementation.
#[derive(Default)]
pub struct ReaderMode;

impl ReaderMode {
    pub fn new() -> Self {
        Self
    }

    /// Strips HTML tags to get plain text.
    fn strip_tags(html: &str) -> String {
        let mut result = String::with_capacity(html.len());
        let mut in_tag = false;
        for ch in html.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => result.push(ch),
                _ => {}
            }
        }
        result
    }

    /// Non-empty, trimmed paragraphs of a passage. Sources send either plain
    /// text or simple markup, so `<br>` and `</p>` count as line breaks.
    fn paragraphs(text: &str) -> Vec<String> {
        let normalized = text
            .replace("\r\n", "\n")
            .replace("<br>", "\n")
            .replace("<br/>", "\n")
            .replace("<br />", "\n")
            .replace("</p>", "\n");
        Self::strip_tags(&normalized)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }
}

/// `#RRGGBB` for an ARGB colour; alpha is dropped.
pub fn css_color(argb: u32) -> String {
    format!("#{:06x}", argb & 0x00FF_FFFF)
}

impl ReaderModeTrait for ReaderMode {
    fn format_passage(&self, text: &str, settings: &ReaderSettings) -> Result<String, ReaderError> {
        let paragraphs = Self::paragraphs(text);
        if paragraphs.is_empty() {
            return Err(ReaderError::EmptyPassage);
        }

        let indent = " ".repeat(settings.indent_size.min(MAX_INDENT_SIZE) as usize * INDENT_WIDTH);
        let separator = "\n".repeat(settings.paragraph_spacing.min(MAX_PARAGRAPH_SPACING) as usize + 1);
        Ok(paragraphs
            .iter()
            .map(|p| format!("{}{}", indent, p))
            .collect::<Vec<_>>()
            .join(&separator))
    }

    fn format_for_display(&self, title: &str, text: &str, settings: &ReaderSettings) -> Result<String, ReaderError> {
        let paragraphs = Self::paragraphs(text);
        if paragraphs.is_empty() {
            return Err(ReaderError::EmptyPassage);
        }

        let body = paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", Self::escape_html(p)))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>
body {{ font-size: {}px; color: {}; background: {}; line-height: 1.6; max-width: 720px; margin: 0 auto; padding: 1.5em; }}
h1 {{ font-size: 1.4em; margin-bottom: 1em; }}
p {{ text-indent: {}em; margin: 0 0 {}em 0; }}
</style></head><body>
<h1>{}</h1>
<div class="content">
{}
</div>
</body></html>"#,
            settings.text_size,
            css_color(settings.text_color),
            css_color(settings.background_color),
            settings.indent_size,
            settings.paragraph_spacing,
            Self::escape_html(title),
            body
        ))
    }

    /// Minutes at roughly 250 words a minute, at least one.
    fn estimate_read_time(&self, text: &str) -> u32 {
        let word_count = Self::strip_tags(text).split_whitespace().count();
        ((word_count as f64) / 250.0).ceil().max(1.0) as u32
    }
}
