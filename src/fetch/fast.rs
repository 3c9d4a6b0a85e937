//! Fast fetcher (C7): a single plain HTTP GET used as a cheap path before
//! launching a browser.

use std::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::Client;
use tracing::debug;

/// Below this many bytes, a response is treated as a paywall/interstitial
/// shell rather than real content (spec §4.7).
const MIN_BODY_BYTES: usize = 2_000;

const FAST_FETCH_UA_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
];

#[derive(Debug, Clone)]
pub struct FastFetchResult {
    pub html: String,
    pub final_url: String,
    pub status_code: u16,
}

/// Attempt a plain HTTP GET with a short timeout and realistic headers.
/// Returns `None` if the transport fails, the response isn't HTML, or the
/// body is below the minimum size floor.
pub async fn fetch(url: &str, requested_timeout: Duration) -> Option<FastFetchResult> {
    let timeout = requested_timeout.min(Duration::from_secs(5));

    let ua = FAST_FETCH_UA_POOL
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FAST_FETCH_UA_POOL[0]);

    let client = match Client::builder()
        .timeout(timeout)
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
    {
        Ok(c) => c,
        Err(err) => {
            debug!(error = %err, "failed to build fast-fetch client");
            return None;
        }
    };

    let response = match client
        .get(url)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            debug!(url, error = %err, "fast-fetch transport error");
            return None;
        }
    };

    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();

    let content_type_is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("text/html"))
        .unwrap_or(false);

    if !content_type_is_html {
        debug!(url, "fast-fetch response is not text/html, falling back to browser");
        return None;
    }

    let body = match response.text().await {
        Ok(b) => b,
        Err(err) => {
            debug!(url, error = %err, "failed to read fast-fetch body");
            return None;
        }
    };

    if body.len() < MIN_BODY_BYTES {
        debug!(url, size = body.len(), "fast-fetch body below minimum size floor");
        return None;
    }

    Some(FastFetchResult {
        html: body,
        final_url,
        status_code,
    })
}
