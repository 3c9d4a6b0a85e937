//! Search result post-processing, implemented as a dedicated pure function
//! so it is independently testable from the HTTP fan-out (SPEC_FULL.md
//! "Supplemented Features"): `site:` rewriting, exclude-domain filtering,
//! URL de-duplication, score sort, and truncation.

use std::collections::HashSet;

use url::Url;

use crate::search::client::UpstreamResult;
use crate::types::SearchResultItem;

/// Rewrite a query to bias the upstream toward a set of include-domains
/// using `site:` operators, when the caller supplied `sources`.
pub fn rewrite_query_with_sources(query: &str, sources: &[String]) -> String {
    if sources.is_empty() {
        return query.to_string();
    }
    let site_clauses = sources
        .iter()
        .map(|d| format!("site:{d}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{query} ({site_clauses})")
}

fn normalised_key(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    trimmed.to_lowercase()
}

fn host_matches_excluded(url: &str, excluded: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    excluded.iter().any(|d| {
        let d = d.to_lowercase();
        host == d || host.ends_with(&format!(".{d}"))
    })
}

/// Filter, dedup, sort by score descending, and truncate upstream results.
pub fn postprocess(
    results: Vec<UpstreamResult>,
    exclude_domains: &[String],
    limit: usize,
) -> Vec<SearchResultItem> {
    let mut seen = HashSet::new();
    let mut filtered: Vec<UpstreamResult> = results
        .into_iter()
        .filter(|r| !host_matches_excluded(&r.url, exclude_domains))
        .filter(|r| seen.insert(normalised_key(&r.url)))
        .collect();

    filtered.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .partial_cmp(&a.score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    filtered
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, r)| SearchResultItem {
            url: r.url,
            title: r.title,
            description: r.content,
            position: idx + 1,
            category: r.category,
            markdown: None,
            html: None,
            raw_html: None,
            links: None,
        })
        .collect()
}
