//! JSON client for the upstream meta-search engine (searxng-like), per
//! spec §6's "Search upstream contract".

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ScrapeError;

#[derive(Debug, Deserialize)]
pub struct UpstreamResult {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub engines: Option<Vec<String>>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, rename = "publishedDate")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpstreamResponse {
    #[serde(default)]
    pub results: Vec<UpstreamResult>,
    #[serde(default)]
    pub number_of_results: Option<u64>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub unresponsive_engines: Vec<serde_json::Value>,
}

/// Query the configured meta-search endpoint for `query`, returning the raw
/// upstream payload. Non-2xx responses and transport failures surface as
/// `ScrapeError::UpstreamSearchError`.
pub async fn search(base_url: &str, query: &str, timeout: Duration) -> Result<UpstreamResponse, ScrapeError> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ScrapeError::UpstreamSearchError(Some(e.to_string())))?;

    let response = client
        .get(base_url)
        .query(&[("q", query), ("format", "json")])
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| {
            debug!(error = %e, "search upstream transport error");
            ScrapeError::UpstreamSearchError(Some(e.to_string()))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(ScrapeError::UpstreamSearchError(Some(format!(
            "upstream returned status {status}"
        ))));
    }

    response
        .json::<UpstreamResponse>()
        .await
        .map_err(|e| ScrapeError::UpstreamSearchError(Some(format!("invalid upstream body: {e}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_a_successful_response() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"results":[{"url":"https://a.example/","title":"A","content":"desc","score":1.5}]}"#;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let result = search(&server.url(), "rust", Duration::from_secs(5)).await.unwrap();
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].title, "A");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_becomes_upstream_search_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = search(&server.url(), "rust", Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_search_error");
        mock.assert_async().await;
    }
}
