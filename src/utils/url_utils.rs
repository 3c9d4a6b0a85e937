//! URL validation utilities.

/// Check if a URL is syntactically valid and uses an http(s) scheme.
///
/// This is a cheap pre-check used by the HTTP layer before the request ever
/// reaches the SSRF guard; the guard itself re-validates and is the
/// authoritative source of the `invalid_url` / `unsupported_protocol` kinds.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_valid_url("http://example.com"));
        assert!(is_valid_url("https://example.com/path?q=1"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("data:text/html,hi"));
        assert!(!is_valid_url("mailto:a@b.com"));
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("not a url"));
    }
}
