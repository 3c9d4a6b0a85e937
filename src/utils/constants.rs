//! Shared configuration constants for citescrape_service

/// Default Chrome user agent string for the fast fetcher and as a fallback
/// when no stealth profile pool entry applies.
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
