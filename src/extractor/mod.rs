//! Content Extractor (C9): parses raw HTML, runs readability-style
//! main-content detection, sanitises to an LLM-safe whitelist, converts to
//! Markdown, tightens whitespace, and pulls metadata.

mod markdown;
mod metadata;
mod prestrip;
mod readability;
mod sanitize;

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::error::ScrapeError;
use crate::types::{ExtractionResult, OutputFormat, ScrapeOptions};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("BUG: hardcoded selector is invalid"));

/// Run the full C9 pipeline over a fetched page.
pub fn extract(
    raw_html: &str,
    final_url: &str,
    status_code: u16,
    opts: &ScrapeOptions,
) -> Result<ExtractionResult, ScrapeError> {
    let base = Url::parse(final_url)
        .map_err(|e| ScrapeError::ExtractionFailed(Some(format!("invalid final url: {e}"))))?;

    let stripped = prestrip::strip_css(raw_html);
    let document = Html::parse_document(&stripped);

    let main = if opts.only_main_content {
        readability::extract_main_content(&document)
    } else {
        readability::whole_document(&document)
    };

    let sanitized_html = sanitize::sanitize(&main.content_html, &base);

    let markdown_raw = markdown::convert(&sanitized_html)
        .map_err(|e| ScrapeError::ExtractionFailed(Some(e.to_string())))?;
    let tightened = markdown::tighten_whitespace(&markdown_raw);
    let markdown_final = markdown::cap_length(&tightened, None);

    let metadata = metadata::extract_metadata(
        &document,
        main.title.as_deref(),
        main.excerpt.as_deref(),
        &base,
        status_code,
    );

    let mut result = ExtractionResult {
        markdown: markdown_final,
        metadata,
        html: None,
        raw_html: None,
        links: None,
    };

    if opts.formats.contains(&OutputFormat::Html) {
        result.html = Some(sanitized_html.clone());
    }
    if opts.formats.contains(&OutputFormat::RawHtml) {
        result.raw_html = Some(raw_html.to_string());
    }
    if opts.formats.contains(&OutputFormat::Links) {
        result.links = Some(extract_links(&sanitized_html));
    }

    Ok(result)
}

fn extract_links(sanitized_html: &str) -> Vec<String> {
    let document = Html::parse_fragment(sanitized_html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in document.select(&ANCHOR_SELECTOR) {
        if let Some(href) = el.value().attr("href")
            && seen.insert(href.to_string())
        {
            links.push(href.to_string());
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(formats: Vec<OutputFormat>) -> ScrapeOptions {
        ScrapeOptions {
            formats,
            only_main_content: true,
            timeout_ms: 30_000,
        }
    }

    const PAGE: &str = r#"<html lang="en"><head>
        <title>Doc Title</title>
        <meta property="og:description" content="A nice article about things.">
    </head><body>
        <nav><a href="/a">a</a><a href="/b">b</a></nav>
        <article>
            <h1>Doc Title</h1>
            <p>This is a long and meaningful paragraph, with enough punctuation, commas,
            and content to score well above the navigation links in the scorer.</p>
            <p><a href="/deep/link">A relative link</a> inside the article body content.</p>
        </article>
    </body></html>"#;

    #[test]
    fn extracts_markdown_and_metadata() {
        let result = extract(PAGE, "https://example.com/page", 200, &opts(vec![OutputFormat::Markdown])).unwrap();
        assert!(result.markdown.contains("Doc Title"));
        assert!(result.markdown.contains("meaningful paragraph"));
        assert_eq!(result.metadata.status_code, 200);
        assert_eq!(result.metadata.source_url, "https://example.com/page");
        assert!(result.html.is_none());
    }

    #[test]
    fn links_format_rewrites_to_absolute() {
        let result = extract(
            PAGE,
            "https://example.com/page",
            200,
            &opts(vec![OutputFormat::Markdown, OutputFormat::Links]),
        )
        .unwrap();
        let links = result.links.unwrap();
        assert!(links.iter().any(|l| l == "https://example.com/deep/link"));
    }

    #[test]
    fn html_and_raw_html_formats_populate_when_requested() {
        let result = extract(
            PAGE,
            "https://example.com/page",
            200,
            &opts(vec![OutputFormat::Html, OutputFormat::RawHtml]),
        )
        .unwrap();
        assert!(result.html.is_some());
        assert!(result.raw_html.is_some());
        assert!(result.raw_html.unwrap().contains("<nav>"));
    }
}
