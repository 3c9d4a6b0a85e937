//! Search meta-engine client and result post-processing (spec §6).

pub mod client;
pub mod postprocess;

pub use client::{UpstreamResponse, UpstreamResult, search};
pub use postprocess::{postprocess as postprocess_results, rewrite_query_with_sources};
