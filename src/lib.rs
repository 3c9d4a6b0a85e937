//! citescrape_service: a self-hosted HTTP service that fetches an arbitrary
//! web page and returns clean, LLM-friendly Markdown, or runs a keyword
//! search against an external meta-search engine and optionally scrapes
//! each result.
//!
//! The core pipeline is `ssrf::preflight → cache → limiter.run(fetch::fetch_fast
//! → on-miss browser_pool + fetch::fetch_with_browser) → extractor → cache`,
//! assembled by [`orchestrator::Orchestrator`] and exposed over HTTP by
//! [`http::build_router`].

pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod fingerprint;
pub mod http;
pub mod limiter;
pub mod orchestrator;
pub mod search;
pub mod ssrf;
pub mod stealth;
pub mod types;
pub mod utils;

pub use error::ScrapeError;
pub use orchestrator::Orchestrator;
pub use types::{ExtractionResult, Metadata, OutputFormat, ScrapeOptions, SearchResultItem};
