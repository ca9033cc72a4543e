//! HTTP transport for asset fetching.

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpError};

use crate::Result;

/// Fetches raw bytes for a source URL.
///
/// The engine performs no retries through this seam: a failed fetch is
/// surfaced as the owning entry's failure and a later re-run of the tool
/// is the retry mechanism.
pub trait Transport: Send + Sync {
    /// Download the full body behind `url` into memory.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
