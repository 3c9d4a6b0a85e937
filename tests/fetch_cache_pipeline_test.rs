//! Integration coverage for the cache + fast-fetch + extractor composition
//! that `Orchestrator::scrape` wires together (spec §8 E4, E5). These drive
//! the pipeline below the SSRF preflight boundary, since a loopback-bound
//! `mockito` server can never pass it by design — the guard itself is
//! exercised directly against a real Chromium-free URL set in
//! `http_security_test.rs` and unit-tested exhaustively in `src/ssrf`.

use std::time::Duration;

use citescrape_service::extractor;
use citescrape_service::fetch::fetch_fast;
use citescrape_service::fingerprint::cache_key;
use citescrape_service::types::{ExtractionResult, OutputFormat, ScrapeOptions};

fn opts() -> ScrapeOptions {
    ScrapeOptions {
        formats: vec![OutputFormat::Markdown],
        only_main_content: true,
        timeout_ms: 5_000,
    }
}

fn big_article(body: &str) -> String {
    format!(
        "<html><head><title>Article</title></head><body><article><h1>Article</h1><p>{}</p></article></body></html>",
        body.repeat(50)
    )
}

#[tokio::test]
async fn e5_fast_fetch_shortcut_serves_without_a_browser() {
    let mut server = mockito::Server::new_async().await;
    let html = big_article("Plenty of real paragraph content, with punctuation and clauses. ");
    let mock = server
        .mock("GET", "/article")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(&html)
        .create_async()
        .await;

    let url = format!("{}/article", server.url());
    let fast = fetch_fast(&url, Duration::from_secs(5))
        .await
        .expect("a >2KB text/html body must satisfy the fast-fetch floor");

    // The whole point of the shortcut: extraction runs straight off the
    // fast-fetch body, and the browser pool is never touched.
    let result = extractor::extract(&fast.html, &fast.final_url, fast.status_code, &opts()).unwrap();
    assert!(result.markdown.contains("Article"));
    mock.assert_async().await;
}

#[tokio::test]
async fn e4_identical_requests_hit_the_result_cache() {
    use citescrape_service::cache::ResultCache;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Key<'a> {
        url: &'a str,
        formats: &'static str,
    }

    let mut server = mockito::Server::new_async().await;
    let html = big_article("Cached content with enough length to clear the fast-fetch floor. ");
    let mock = server
        .mock("GET", "/cached")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(&html)
        .expect(1)
        .create_async()
        .await;

    let url = format!("{}/cached", server.url());
    let cache: ResultCache<ExtractionResult> = ResultCache::new(10, Duration::from_secs(60));
    let key = cache_key(
        "scrape",
        &Key {
            url: &url,
            formats: "markdown",
        },
    );

    async fn scrape_once(url: &str) -> ExtractionResult {
        let fast = fetch_fast(url, Duration::from_secs(5)).await.unwrap();
        extractor::extract(&fast.html, &fast.final_url, fast.status_code, &opts()).unwrap()
    }

    assert!(cache.get(&key).await.is_none());
    let first = scrape_once(&url).await;
    cache.set(key.clone(), first.clone()).await;

    // Second call never re-fetches: the cache alone serves an identical
    // payload, matching the byte-identical-data guarantee in spec §8 E4.
    let second = cache.get(&key).await.expect("second call must be a cache hit");
    assert_eq!(second.markdown, first.markdown);

    mock.assert_async().await;
}
