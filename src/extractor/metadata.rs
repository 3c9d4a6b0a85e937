//! Metadata extraction: indexes every `<meta>` tag by `name|property|itemprop`
//! (lowercased) and reads the fields listed in spec §3 / §4.9.

use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

use crate::types::Metadata;

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("BUG: hardcoded selector is invalid"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("BUG: hardcoded selector is invalid"));
static HTML_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html").expect("BUG: hardcoded selector is invalid"));
static CANONICAL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel="canonical" i]"#).expect("BUG: hardcoded selector is invalid")
});
static ICON_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel="icon" i], link[rel="shortcut icon" i]"#)
        .expect("BUG: hardcoded selector is invalid")
});

fn index_meta_tags(document: &Html) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for el in document.select(&META_SELECTOR) {
        let key = el
            .value()
            .attr("name")
            .or_else(|| el.value().attr("property"))
            .or_else(|| el.value().attr("itemprop"))
            .map(|s| s.to_lowercase());
        if let (Some(key), Some(content)) = (key, el.value().attr("content")) {
            index.entry(key).or_insert_with(|| content.to_string());
        }
    }
    index
}

fn resolve(href: &str, base: &Url) -> Option<String> {
    Url::options()
        .base_url(Some(base))
        .parse(href)
        .ok()
        .map(|u| u.to_string())
}

/// Build page metadata from the full parsed document and the values the
/// readability pass already recovered for title/excerpt.
pub fn extract_metadata(
    document: &Html,
    article_title: Option<&str>,
    article_excerpt: Option<&str>,
    final_url: &Url,
    status_code: u16,
) -> Metadata {
    let meta = index_meta_tags(document);

    let doc_title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    let title = article_title
        .map(str::to_string)
        .or_else(|| meta.get("og:title").cloned())
        .or(doc_title);

    let description = article_excerpt
        .map(str::to_string)
        .or_else(|| meta.get("og:description").cloned())
        .or_else(|| meta.get("description").cloned());

    let language = document
        .select(&HTML_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::to_string)
        .or_else(|| meta.get("og:locale").cloned());

    let canonical_url = document
        .select(&CANONICAL_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve(href, final_url));

    let favicon = document
        .select(&ICON_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve(href, final_url))
        .or_else(|| resolve("/favicon.ico", final_url));

    Metadata {
        title,
        description,
        language,
        source_url: final_url.to_string(),
        status_code,
        author: meta.get("author").or_else(|| meta.get("article:author")).cloned(),
        site_name: meta.get("og:site_name").cloned(),
        og_type: meta.get("og:type").cloned(),
        og_url: meta.get("og:url").cloned(),
        image: meta.get("og:image").cloned(),
        published_time: meta.get("article:published_time").cloned(),
        modified_time: meta.get("article:modified_time").cloned(),
        canonical_url,
        favicon,
        keywords: meta.get("keywords").cloned(),
        generator: meta.get("generator").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_og_tags_and_lang() {
        let html = r#"<html lang="en-US"><head>
            <meta property="og:title" content="OG Title">
            <meta name="description" content="A description">
            <meta property="og:site_name" content="Example Site">
            <link rel="canonical" href="/canon">
        </head><body></body></html>"#;
        let document = Html::parse_document(html);
        let base = Url::parse("https://example.com/page").unwrap();
        let metadata = extract_metadata(&document, None, None, &base, 200);
        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
        assert_eq!(metadata.description.as_deref(), Some("A description"));
        assert_eq!(metadata.language.as_deref(), Some("en-US"));
        assert_eq!(metadata.site_name.as_deref(), Some("Example Site"));
        assert_eq!(
            metadata.canonical_url.as_deref(),
            Some("https://example.com/canon")
        );
    }

    #[test]
    fn falls_back_to_title_tag_and_default_favicon() {
        let html = "<html><head><title>Plain Title</title></head><body></body></html>";
        let document = Html::parse_document(html);
        let base = Url::parse("https://example.com/page").unwrap();
        let metadata = extract_metadata(&document, None, None, &base, 200);
        assert_eq!(metadata.title.as_deref(), Some("Plain Title"));
        assert_eq!(
            metadata.favicon.as_deref(),
            Some("https://example.com/favicon.ico")
        );
    }

    #[test]
    fn article_title_and_excerpt_take_priority() {
        let html = r#"<html><head><title>Doc Title</title>
            <meta property="og:title" content="OG Title"></head><body></body></html>"#;
        let document = Html::parse_document(html);
        let base = Url::parse("https://example.com/page").unwrap();
        let metadata =
            extract_metadata(&document, Some("Article Title"), Some("Article excerpt"), &base, 200);
        assert_eq!(metadata.title.as_deref(), Some("Article Title"));
        assert_eq!(metadata.description.as_deref(), Some("Article excerpt"));
    }
}
