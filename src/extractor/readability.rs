//! Pipeline step 3: "readability"-style main-content detection.
//!
//! The teacher's `main_content_extraction` picks the first matching
//! semantic container from a fixed priority list of selectors. That alone
//! isn't the text-density/link-density scoring the specification calls for,
//! so this module keeps the teacher's selector pool as the candidate seed
//! set but adds genuine scoring on top of it, with a relaxed-threshold
//! retry and a full-body fallback.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Candidate container tags, in the same spirit as the teacher's semantic
/// selector list but widened to give the scorer real choices to compare.
static CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("main, article, [role='main'], div, section, td")
        .expect("BUG: hardcoded CSS selector is invalid")
});

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("BUG: hardcoded CSS selector is invalid"));

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BUG: hardcoded CSS selector is invalid"));

static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("BUG: hardcoded CSS selector is invalid"));

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("BUG: hardcoded CSS selector is invalid"));

static P_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("BUG: hardcoded CSS selector is invalid"));

/// The outcome of main-content detection.
pub struct MainContent {
    pub content_html: String,
    pub title: Option<String>,
    pub excerpt: Option<String>,
}

struct Thresholds {
    /// Minimum character count of a candidate's own text to be considered.
    min_chars: usize,
    /// Minimum score required to be selected at all.
    min_score: f64,
}

const STRICT: Thresholds = Thresholds {
    min_chars: 140,
    min_score: 20.0,
};

const RELAXED: Thresholds = Thresholds {
    min_chars: 40,
    min_score: 5.0,
};

/// Score a candidate's own text (not counting descendant candidate text) by
/// length, punctuation density, and a link-density penalty.
fn score_candidate(el: ElementRef, thresholds: &Thresholds) -> Option<f64> {
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    let trimmed = text.trim();
    if trimmed.len() < thresholds.min_chars {
        return None;
    }

    let link_text_len: usize = el
        .select(&LINK_SELECTOR)
        .map(|a| a.text().collect::<String>().len())
        .sum();
    let link_density = link_text_len as f64 / trimmed.len().max(1) as f64;
    if link_density > 0.8 {
        return None;
    }

    let commas = trimmed.matches(',').count();
    let paragraphs = el.select(&P_SELECTOR).count();

    let base = (trimmed.len() as f64).sqrt();
    let punctuation_weight = 1.0 + (commas as f64 * 0.1) + (paragraphs as f64 * 0.5);
    let score = base * punctuation_weight * (1.0 - link_density);

    if score < thresholds.min_score {
        None
    } else {
        Some(score)
    }
}

fn pick_best(document: &Html, thresholds: &Thresholds) -> Option<String> {
    let mut best: Option<(f64, String)> = None;
    for el in document.select(&CANDIDATE_SELECTOR) {
        if let Some(score) = score_candidate(el, thresholds) {
            let better = match &best {
                Some((best_score, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((score, el.html()));
            }
        }
    }
    best.map(|(_, html)| html)
}

fn document_title(document: &Html) -> Option<String> {
    document
        .select(&H1_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            document
                .select(&TITLE_SELECTOR)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

fn excerpt_from(html_fragment: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html_fragment);
    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(300).collect())
    }
}

/// Bypass scoring entirely and use the full `<body>`, for
/// `only_main_content: false` requests.
pub fn whole_document(document: &Html) -> MainContent {
    let title = document_title(document);
    let content_html = document
        .select(&BODY_SELECTOR)
        .next()
        .map(|el| el.html())
        .unwrap_or_else(|| document.root_element().html());
    let excerpt = excerpt_from(&content_html);
    MainContent {
        content_html,
        title,
        excerpt,
    }
}

/// Run the readability heuristic against a parsed document. Falls back to a
/// relaxed pass, then to the full `<body>`, per spec §4.9 step 3.
pub fn extract_main_content(document: &Html) -> MainContent {
    let title = document_title(document);

    let content_html = pick_best(document, &STRICT)
        .or_else(|| pick_best(document, &RELAXED))
        .unwrap_or_else(|| {
            document
                .select(&BODY_SELECTOR)
                .next()
                .map(|el| el.html())
                .unwrap_or_else(|| document.root_element().html())
        });

    let excerpt = excerpt_from(&content_html);

    MainContent {
        content_html,
        title,
        excerpt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_dense_article_over_sparse_nav() {
        let html = r#"
            <html><body>
                <nav><a href="/a">a</a><a href="/b">b</a><a href="/c">c</a></nav>
                <article>
                    <p>This is a long, meaningful paragraph about the subject matter at hand, with
                    enough words and punctuation, commas, and sentences to score well above the
                    navigation bar full of short link text.</p>
                    <p>A second paragraph continues the discussion, adding more detail, more
                    commas, and more substantial prose content for the reader to consume.</p>
                </article>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let result = extract_main_content(&document);
        assert!(result.content_html.contains("subject matter"));
        assert!(!result.content_html.contains("nav"));
    }

    #[test]
    fn falls_back_to_body_when_nothing_scores() {
        let html = "<html><body><span>x</span></body></html>";
        let document = Html::parse_document(html);
        let result = extract_main_content(&document);
        assert!(result.content_html.contains('x'));
    }

    #[test]
    fn prefers_h1_title_then_title_tag() {
        let html = "<html><head><title>Fallback</title></head><body><h1>Real Title</h1><p>body text that is long enough to pass thresholds, with commas, and more commas, and words.</p></body></html>";
        let document = Html::parse_document(html);
        let result = extract_main_content(&document);
        assert_eq!(result.title.as_deref(), Some("Real Title"));
    }
}
