//! Orchestrator (C10): glues the SSRF guard, cache, concurrency limiter,
//! two-tier fetcher and content extractor together, per spec §4.10.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser_pool::BrowserPool;
use crate::cache::ResultCache;
use crate::config::ServiceConfig;
use crate::error::ScrapeError;
use crate::fetch::{fetch_fast, fetch_with_browser};
use crate::fingerprint::cache_key;
use crate::limiter::ConcurrencyLimiter;
use crate::search;
use crate::ssrf;
use crate::stealth::ProxyRotation;
use crate::types::{ExtractionResult, OutputFormat, ScrapeOptions, SearchResultItem};
use crate::{extractor, utils};

/// Canonicalised cache-key input for a scrape operation (spec §4.10 step 2).
#[derive(Serialize)]
struct ScrapeCacheKey<'a> {
    url: &'a str,
    formats: String,
    only_main_content: bool,
}

/// Owns the long-lived subsystems (cache, limiter, browser pool) and
/// exposes the two core operations: scrape and search.
pub struct Orchestrator {
    cache: ResultCache<ExtractionResult>,
    limiter: ConcurrencyLimiter,
    browser_pool: Arc<BrowserPool>,
    proxy_rotation: ProxyRotation,
    config: ServiceConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let cache = ResultCache::new(
            config.cache_max_items,
            Duration::from_millis(config.cache_ttl_ms),
        );
        let limiter = ConcurrencyLimiter::new(config.max_concurrency);
        let browser_pool = Arc::new(BrowserPool::new(config.browser_max_requests, true));
        let proxy_rotation = ProxyRotation::new(config.proxy_list.clone());

        Self {
            cache,
            limiter,
            browser_pool,
            proxy_rotation,
            config,
        }
    }

    /// Run the full scrape pipeline for one URL: preflight, cache, two-tier
    /// fetch, extraction, cache-store. Never caches a failure.
    pub async fn scrape(&self, url: &str, opts: ScrapeOptions) -> Result<ExtractionResult, ScrapeError> {
        if !utils::is_valid_url(url) {
            return Err(ScrapeError::InvalidUrl(None));
        }

        ssrf::preflight(url)
            .await
            .map_err(ScrapeError::from_block_reason)?;

        let key = cache_key(
            "scrape",
            &ScrapeCacheKey {
                url,
                formats: sorted_formats(&opts.formats),
                only_main_content: opts.only_main_content,
            },
        );

        if let Some(hit) = self.cache.get(&key).await {
            debug!(url, "cache hit");
            return Ok(hit);
        }

        let timeout = Duration::from_millis(opts.timeout_ms);
        let result = self
            .limiter
            .run(|| self.fetch_and_extract(url, &opts, timeout))
            .await?;

        self.cache.set(key, result.clone()).await;
        Ok(result)
    }

    async fn fetch_and_extract(
        &self,
        url: &str,
        opts: &ScrapeOptions,
        timeout: Duration,
    ) -> Result<ExtractionResult, ScrapeError> {
        if let Some(fast) = fetch_fast(url, timeout).await {
            debug!(url, "fast-fetch shortcut succeeded, browser pool not acquired");
            return extractor::extract(&fast.html, &fast.final_url, fast.status_code, opts);
        }

        info!(url, "fast-fetch missed, falling back to browser");
        let handle = self
            .browser_pool
            .acquire()
            .await
            .map_err(|e| ScrapeError::NavigationFailed(Some(e.to_string())))?;

        let proxy = self.proxy_rotation.next_proxy().map(str::to_string);
        let browser_result = fetch_with_browser(&handle, url, timeout, proxy.as_deref())
            .await
            .map_err(|e| match e {
                crate::fetch::BrowserFetchError::NavigationFailed(detail) => {
                    ScrapeError::NavigationFailed(Some(detail))
                }
                crate::fetch::BrowserFetchError::UnsupportedContentType(detail) => {
                    ScrapeError::UnsupportedContentType(Some(detail))
                }
            })?;

        extractor::extract(
            &browser_result.html,
            &browser_result.final_url,
            browser_result.status_code,
            opts,
        )
    }

    /// Run a keyword search against the configured upstream and, if
    /// requested, fan out a scrape per result through the same limiter and
    /// cache (spec §6).
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        sources: &[String],
        scrape_formats: &[OutputFormat],
        only_main_content: bool,
    ) -> Result<Vec<SearchResultItem>, ScrapeError> {
        let base_url = self
            .config
            .searxng_url
            .as_deref()
            .ok_or_else(|| ScrapeError::UpstreamSearchError(Some("no search upstream configured".into())))?;

        let rewritten = search::rewrite_query_with_sources(query, sources);
        let timeout = Duration::from_millis(self.config.searxng_timeout_ms);
        let upstream = search::search(base_url, &rewritten, timeout).await?;

        let mut items = search::postprocess_results(upstream.results, &[], limit);

        if !scrape_formats.is_empty() {
            let opts = ScrapeOptions {
                formats: scrape_formats.to_vec(),
                only_main_content,
                timeout_ms: self.config.max_timeout_ms,
            };

            // Fan out one scrape per result concurrently; each individually
            // passes through the same limiter and cache as a bare scrape, so
            // the limiter's `max` still bounds total in-flight browser work.
            let outcomes = futures::future::join_all(
                items.iter().map(|item| self.scrape(&item.url, opts.clone())),
            )
            .await;

            for (item, outcome) in items.iter_mut().zip(outcomes) {
                match outcome {
                    Ok(extraction) => {
                        item.markdown = Some(extraction.markdown);
                        item.html = extraction.html;
                        item.raw_html = extraction.raw_html;
                        item.links = extraction.links;
                    }
                    Err(err) => {
                        warn!(url = %item.url, error = %err, "search fan-out scrape failed, keeping bare result");
                    }
                }
            }
        }

        Ok(items)
    }
}

fn sorted_formats(formats: &[OutputFormat]) -> String {
    let mut names: Vec<&'static str> = formats
        .iter()
        .map(|f| match f {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Html => "html",
            OutputFormat::RawHtml => "rawHtml",
            OutputFormat::Links => "links",
        })
        .collect();
    names.sort_unstable();
    names.join(",")
}
