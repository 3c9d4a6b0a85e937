//! Fetch strategies: a cheap plain-HTTP pass (C7) tried first, falling back
//! to a rendered browser fetch (C8) when the fast path doesn't look like
//! real content.

pub mod browser;
pub mod fast;

pub use browser::{BrowserFetchError, BrowserFetchResult, fetch as fetch_with_browser};
pub use fast::{FastFetchResult, fetch as fetch_fast};
