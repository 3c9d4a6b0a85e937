//! Core data model: scrape requests/results and search results, shared
//! between the orchestrator and the HTTP surface.

use serde::{Deserialize, Serialize};

/// Output formats a caller may request alongside the implicit markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    Markdown,
    Html,
    RawHtml,
    Links,
}

/// A scrape request as accepted by the orchestrator, already validated and
/// defaulted by the HTTP layer.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub formats: Vec<OutputFormat>,
    pub only_main_content: bool,
    pub timeout_ms: u64,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            formats: vec![OutputFormat::Markdown],
            only_main_content: true,
            timeout_ms: 30_000,
        }
    }
}

/// Page metadata, spec §3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub source_url: String,
    pub status_code: u16,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub og_type: Option<String>,
    pub og_url: Option<String>,
    pub image: Option<String>,
    pub published_time: Option<String>,
    pub modified_time: Option<String>,
    pub canonical_url: Option<String>,
    pub favicon: Option<String>,
    pub keywords: Option<String>,
    pub generator: Option<String>,
}

/// The result of a single extraction, spec §3. `markdown` is non-empty iff
/// extraction succeeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub markdown: String,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
}

/// A single web search result, shaped per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub url: String,
    pub title: String,
    pub description: String,
    pub position: usize,
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
}
