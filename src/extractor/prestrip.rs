//! Pipeline step 1: strip CSS noise from the raw HTML string before parsing.
//!
//! Operating on the string directly (rather than post-parse) keeps the
//! parser from ever tokenising large inline `<style>` blocks, mirroring the
//! teacher's `html_cleaning` pass which runs before the DOM is built.

use once_cell::sync::Lazy;
use regex::Regex;

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("valid regex"));

static LINK_STYLESHEET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*\brel\s*=\s*["']?stylesheet["']?[^>]*>"#)
        .expect("valid regex")
});

static STYLE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\s+style\s*=\s*("[^"]*"|'[^']*')"#).expect("valid regex"));

/// Remove `<style>` blocks, `<link rel="stylesheet">` tags and inline
/// `style="..."` attributes from raw HTML.
pub fn strip_css(html: &str) -> String {
    let no_style_blocks = STYLE_BLOCK.replace_all(html, "");
    let no_link_sheets = LINK_STYLESHEET.replace_all(&no_style_blocks, "");
    STYLE_ATTR.replace_all(&no_link_sheets, "").into_owned()
}
