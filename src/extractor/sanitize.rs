//! Pipeline steps 4-8: absolute link rewriting, element removal, figure
//! handling, whitelist unwrap and attribute scrubbing.
//!
//! Implemented as a typed, node-type-switched traversal (design note §9)
//! rather than in-place DOM mutation: we walk the parsed fragment once and
//! serialize a new, policy-compliant HTML string. The traversal shape is
//! adapted from the teacher's `serialize_html_with_unwrap`.

use scraper::node::{Element, Node};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BUG: hardcoded selector is invalid"));

static FIGCAPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("figcaption").expect("BUG: hardcoded selector is invalid"));

const REMOVE_TAGS: &[&str] = &[
    "img", "picture", "source", "video", "audio", "iframe", "embed", "object", "canvas", "svg",
    "script", "style", "noscript", "form", "button", "input", "select", "textarea", "link",
    "nav", "header", "footer", "aside",
];

const WHITELIST_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "ul", "ol", "li", "a", "pre", "code", "blockquote",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td", "em", "i", "strong", "b", "hr", "br",
    "dl", "dt", "dd", "sup", "sub", "abbr", "mark", "del", "ins", "details", "summary",
];

const VOID_TAGS: &[&str] = &["br", "hr"];

const BLOCKED_CLASS_SUBSTRINGS: &[&str] =
    &["sidebar", "ad-", "advertisement", "social", "share", "related"];

/// Sanitise an HTML fragment against the spec §4.9 whitelist, rewriting
/// anchor hrefs to absolute URLs against `base`.
pub fn sanitize(html_fragment: &str, base: &Url) -> String {
    let document = Html::parse_fragment(html_fragment);
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    sanitize_children(&root, base, &mut out);
    out
}

fn should_remove_by_attrs(el: &Element) -> bool {
    if el.attr("aria-live").is_some() {
        return true;
    }
    if let Some(role) = el.attr("role") {
        let role = role.to_lowercase();
        if matches!(role.as_str(), "banner" | "navigation" | "contentinfo") {
            return true;
        }
    }
    if let Some(class) = el.attr("class") {
        let class = class.to_lowercase();
        if BLOCKED_CLASS_SUBSTRINGS.iter().any(|p| class.contains(p)) {
            return true;
        }
    }
    if let Some(id) = el.attr("id")
        && id.to_lowercase().contains("ad-")
    {
        return true;
    }
    false
}

fn rewrite_href(href: &str, base: &Url) -> String {
    match Url::options().base_url(Some(base)).parse(href) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => href.to_string(),
    }
}

fn sanitize_children(element: &ElementRef, base: &Url, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text_into(text, out),
            Node::Element(_) => {
                let Some(child_elem) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_elem.value().name().to_lowercase();

                if REMOVE_TAGS.contains(&name.as_str()) || should_remove_by_attrs(child_elem.value())
                {
                    continue;
                }

                if name == "figure" {
                    if let Some(caption) = child_elem.select(&FIGCAPTION_SELECTOR).next() {
                        let text: String = caption.text().collect();
                        out.push_str("<p>");
                        escape_text_into(text.trim(), out);
                        out.push_str("</p>");
                    }
                    continue;
                }

                if WHITELIST_TAGS.contains(&name.as_str()) {
                    out.push('<');
                    out.push_str(&name);
                    if name == "a"
                        && let Some(href) = child_elem.value().attr("href")
                    {
                        let absolute = rewrite_href(href, base);
                        out.push_str(" href=\"");
                        escape_attr_into(&absolute, out);
                        out.push('"');
                    }
                    out.push('>');

                    if !VOID_TAGS.contains(&name.as_str()) {
                        sanitize_children(&child_elem, base, out);
                        out.push_str("</");
                        out.push_str(&name);
                        out.push('>');
                    }
                } else {
                    // Not in the whitelist: unwrap, keeping its children in place.
                    sanitize_children(&child_elem, base, out);
                }
            }
            _ => {}
        }
    }
}

fn escape_text_into(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr_into(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/articles/post").unwrap()
    }

    #[test]
    fn strips_script_and_style_and_img() {
        let html = r#"<div><script>evil()</script><style>.x{}</style><img src="x.png"><p>kept</p></div>"#;
        let out = sanitize(html, &base());
        assert!(!out.contains("script"));
        assert!(!out.contains("<style"));
        assert!(!out.contains("<img"));
        assert!(out.contains("<p>kept</p>"));
    }

    #[test]
    fn unwraps_non_whitelisted_div_but_keeps_text() {
        let html = r#"<div class="wrapper"><p>hello</p></div>"#;
        let out = sanitize(html, &base());
        assert!(!out.contains("<div"));
        assert!(out.contains("<p>hello</p>"));
    }

    #[test]
    fn rewrites_relative_href_to_absolute() {
        let html = r#"<p><a href="/other">link</a></p>"#;
        let out = sanitize(html, &base());
        assert!(out.contains(r#"href="https://example.com/other""#));
    }

    #[test]
    fn leaves_malformed_href_untouched() {
        let html = r#"<p><a href="not a url">link</a></p>"#;
        let out = sanitize(html, &base());
        assert!(out.contains(r#"href="not a url""#));
    }

    #[test]
    fn strips_non_href_attributes_from_anchor() {
        let html = r#"<p><a href="/x" onclick="evil()" class="y">link</a></p>"#;
        let out = sanitize(html, &base());
        assert!(!out.contains("onclick"));
        assert!(!out.contains("class"));
    }

    #[test]
    fn figure_becomes_paragraph_of_caption() {
        let html = r#"<figure><img src="a.png"><figcaption>A caption</figcaption></figure>"#;
        let out = sanitize(html, &base());
        assert_eq!(out, "<p>A caption</p>");
    }

    #[test]
    fn figure_without_caption_is_dropped() {
        let html = r#"<figure><img src="a.png"></figure>"#;
        let out = sanitize(html, &base());
        assert_eq!(out, "");
    }

    #[test]
    fn drops_sidebar_classed_elements() {
        let html = r#"<div class="sidebar-widget"><p>ad content</p></div><p>real</p>"#;
        let out = sanitize(html, &base());
        assert!(!out.contains("ad content"));
        assert!(out.contains("real"));
    }
}
